use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataSmartError {
    #[error("variable {0} does not exist")]
    NoSuchVariable(String),
}

pub type DataSmartResult<T> = anyhow::Result<T>;
