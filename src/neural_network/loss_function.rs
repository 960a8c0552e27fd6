/// Mean Absolute Error loss function
pub mod mean_absolute_error;
/// Mean Squared Error loss function
pub mod mean_squared_error;

pub use mean_absolute_error::*;
pub use mean_squared_error::*;
