//! DTOs module - Data Transfer Objects
//!
//! Questo modulo contiene tutti i DTOs usati per la comunicazione client-server.
//! I DTOs separano la rappresentazione esterna (API) dalla rappresentazione interna (entities).

pub mod article;
pub mod friend_request;
pub mod group;
pub mod query;
pub mod response;
pub mod ticket;
pub mod user;

// Re-exports per facilitare l'import
pub use article::{ArticleDTO, CreateArticleDTO, ModerationDecisionDTO};
pub use friend_request::{
    CreateFriendRequestDTO, EnrichedFriendRequestDTO, MutualConnectionsDTO, SendFriendRequestDTO,
    UpdateFriendRequestDTO,
};
pub use group::{
    ActionsQuery, AllowedActionsDTO, CreateGroupDTO, GroupDTO, GroupMembersDTO, MemberAction,
    MemberActionDTO, MemberDTO,
};
pub use query::{PageQuery, Paginated};
pub use response::MutationResponse;
pub use ticket::{CreatePageDTO, CreateTicketDTO, PageDTO};
pub use user::UserDTO;
