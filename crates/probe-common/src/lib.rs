mod error;
mod tls;

pub use error::ProbeError;
pub use tls::{
    load_certs_from_pem, load_client_config_from_pem, load_private_key_from_pem,
    load_server_config_from_pem,
};
