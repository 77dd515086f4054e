mod dispatcher;

pub use dispatcher::Dispatcher;
pub(crate) use dispatcher::resolve_config;
