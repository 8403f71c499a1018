pub mod root;
pub mod members;
pub mod checkout;
pub mod webhooks;
