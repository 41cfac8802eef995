//! Application layer: services orchestrating domain and ports.
//!
//! One service per protocol role: [`ScreeningService`] drives the client
//! side of a screening end to end, [`PsiResponder`] answers exchanges on
//! the registry side.

mod responder;
mod screening;

pub use responder::PsiResponder;
pub use screening::ScreeningService;
