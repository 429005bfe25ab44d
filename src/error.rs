use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Nenhuma rota encontrada nos dados.")]
    EmptyCatalog,

    #[error("Horário inválido {time:?}, esperado HH:MM")]
    InvalidTime { time: String },

    #[error("Horários fora de ordem na rota {route_id:?}: {previous} antes de {current}")]
    UnsortedTimes {
        route_id: String,
        previous: String,
        current: String,
    },

    #[error("Rota duplicada {route_id:?}")]
    DuplicateRoute { route_id: String },

    #[error("Config directory is not available")]
    NoConfigDir,

    #[error("Falha ao processar os dados: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
