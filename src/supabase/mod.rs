// SPDX-License-Identifier: MPL-2.0

mod client;
mod realtime;
mod types;

pub use client::{ClientError, SupabaseClient};
pub use realtime::{Subscription, subscribe_inserts};
pub use types::{Message, NewMessage, User};
