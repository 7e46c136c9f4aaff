use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrescriptionError {
    #[error("Itens duplicados: {}", .0.join(", "))]
    DuplicateItems(Vec<String>),

    #[error("Nenhum item selecionado")]
    NothingSelected,

    #[error("Unknown prescription status: {0}")]
    UnknownStatus(String),
}

pub type PrescriptionResult<T> = Result<T, PrescriptionError>;
