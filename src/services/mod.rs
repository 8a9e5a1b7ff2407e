pub mod auth;
pub mod checkout;
pub mod confirmation;
pub mod gateway;
pub mod tokenizer;

pub use auth::{AuthClient, AuthError};
pub use checkout::{CheckoutError, CheckoutEvent, CheckoutFlow, CheckoutSession};
pub use gateway::{GatewayError, PaymentGatewayClient};
pub use tokenizer::{CardData, CardTokenizerClient, TokenizerError};
