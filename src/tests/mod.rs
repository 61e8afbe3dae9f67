pub mod common;

mod http_transport;
