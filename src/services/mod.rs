pub mod payments;

pub use payments::{CreateItemRequest, PaymentMarked, PaymentService, UpdateItemRequest};
