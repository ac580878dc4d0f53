//! ブラウザ起動
//!
//! 無頭ブラウザのプロセス起動と CDP イベントループの面倒を見る。

pub mod headless;

pub use headless::launch_headless;
