mod resolver;

pub use resolver::{QueryResolver, ResolverOptions};
