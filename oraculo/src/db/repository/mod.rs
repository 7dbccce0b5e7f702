mod consultas;

pub use consultas::ConsultaRepository;
