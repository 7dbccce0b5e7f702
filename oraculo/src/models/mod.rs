mod consulta;

pub use consulta::*;
