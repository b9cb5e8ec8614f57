// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::credentials::AuthToken;

/// The record the storage backends persist between runs.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct Data {
    token: AuthToken,
}

impl Data {
    pub(crate) const fn new(token: AuthToken) -> Self {
        Self { token }
    }

    pub(crate) fn into_token(self) -> AuthToken {
        self.token
    }
}
