pub mod chat;
pub mod health;
pub mod historial;
pub mod saldo;

pub use chat::chat;
pub use health::health_check;
pub use historial::historial;
pub use saldo::saldo;
