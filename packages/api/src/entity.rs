pub mod connection;
pub mod ingestion_token;
pub mod membership;
pub mod sea_orm_active_enums;
pub mod source;
pub mod team;
pub mod user;

pub mod prelude {
    pub use super::connection::Entity as Connection;
    pub use super::ingestion_token::Entity as IngestionToken;
    pub use super::membership::Entity as Membership;
    pub use super::source::Entity as Source;
    pub use super::team::Entity as Team;
    pub use super::user::Entity as User;
}
