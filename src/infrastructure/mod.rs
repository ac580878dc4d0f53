//! 基盤層（Infrastructure）
//!
//! 希少資源（ブラウザ / ページ）を保持し、能力だけを公開する。

pub mod locator;
pub mod session;

pub use locator::{Locator, RankedLocator};
pub use session::{Session, WaitPolicy};
