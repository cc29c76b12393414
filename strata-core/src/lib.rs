pub mod config;
pub mod logging;
pub mod store;

pub use config::Config;
pub use logging::{init_logging, LogLevel};
pub use store::{
    ChangeEvent, ChangeOrigin, ConnectionState, LocalStore, Node, Payload, RemoteOptions,
    RemoteStore, Store, StoreError, StoreResult, Version,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Ensure the main exports are accessible
        let _ = LogLevel::Info;
        let _ = ConnectionState::Anonymous;
        let _ = Node::empty();
    }
}
