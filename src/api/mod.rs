pub mod codec;
pub mod invoker;
pub mod request;
pub mod response;
