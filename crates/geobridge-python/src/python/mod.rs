mod conversion;
mod cursor;
mod object;
mod types;

pub use cursor::PyFeatureCursor;
pub use object::PyDatasourceObject;
pub use types::{register_module, PyBox2d, PyCoord, PyQuery};
