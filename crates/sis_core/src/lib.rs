pub mod domain;
pub mod ports;

pub use domain::{
    AuthSession, NewStudent, NewUser, Student, StudentUpdate, User, UserCredentials, UserUpdate,
};
pub use ports::{PortError, PortResult, RegistryStore};
