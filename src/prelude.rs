pub use derive_new::new;
pub use serde::{Deserialize, Serialize};
pub use snafu::{Location, OptionExt as _, ResultExt as _, Snafu};

pub use crate::database::{Database, DatabaseError};
pub use crate::model::*;
