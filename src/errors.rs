use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocStoreError {
    #[error("transaction state error: {0}")]
    TransactionState(String),
}

impl DocStoreError {
    pub fn transaction_state<T: Into<String>>(msg: T) -> Self {
        DocStoreError::TransactionState(msg.into())
    }
}
