pub mod model;

pub use model::{NewPatient, NewUser, Page, PageRequest, Patient, PatientPatch, User, UserPatch};
