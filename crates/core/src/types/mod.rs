//! Core types for Segundo Lote.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod balance;
pub mod cpf;
pub mod id;
pub mod money;
pub mod status;

pub use balance::Balance;
pub use cpf::{format_cpf, is_valid_cpf};
pub use id::*;
pub use money::{MoneyError, format_brl, parse_brl};
pub use status::TicketStatus;
