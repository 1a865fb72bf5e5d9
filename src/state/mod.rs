// SPDX-License-Identifier: MPL-2.0

mod login;
mod session;

pub use login::{CredentialVerifier, FlowError, LoginFlow, LoginStep, PlainPinVerifier, UserDirectory};
pub use session::{ChatSession, MessageLog, clip_status};
