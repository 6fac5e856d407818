use contesa::observers::ObserverError;
use contesa::BenchError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Bench(#[from] BenchError),

    #[error("{0}")]
    Report(#[from] ObserverError),
}
