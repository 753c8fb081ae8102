use pantry_types::models::RelationKind;
use thiserror::Error;
use uuid::Uuid;

pub type CoreResult<T> = Result<T, CoreError>;

/// Every failure a core operation can report. All variants except `Storage`
/// are caller mistakes and are recoverable at the request boundary.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0} already exists")]
    AlreadyExists(RelationKind),

    #[error("{0} does not exist")]
    NotFound(RelationKind),

    #[error("cannot subscribe to yourself")]
    SelfSubscription,

    #[error("amount {amount} for ingredient {ingredient_id} must be between 1 and {max}")]
    InvalidAmount {
        ingredient_id: Uuid,
        amount: i64,
        max: u32,
    },

    #[error("cooking time {value} must be between 1 and {max}")]
    InvalidCookingTime { value: i64, max: u32 },

    #[error("ingredient {0} is listed more than once")]
    DuplicateIngredientInRecipe(Uuid),

    #[error("a recipe needs at least one ingredient")]
    EmptyIngredientList,

    #[error("unknown ingredient {0}")]
    UnknownIngredient(Uuid),

    #[error("unknown tag {0}")]
    UnknownTag(Uuid),

    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),

    #[error("field `{field}` is longer than {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("recipe {0} not found")]
    RecipeNotFound(Uuid),

    #[error("user {0} not found")]
    UserNotFound(Uuid),

    #[error("only the author may change this recipe")]
    Forbidden,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl CoreError {
    /// Stable machine-readable code for the variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyExists(_) => "already_exists",
            Self::NotFound(_) => "not_found",
            Self::SelfSubscription => "self_subscription",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::InvalidCookingTime { .. } => "invalid_cooking_time",
            Self::DuplicateIngredientInRecipe(_) => "duplicate_ingredient_in_recipe",
            Self::EmptyIngredientList => "empty_ingredient_list",
            Self::UnknownIngredient(_) => "unknown_ingredient",
            Self::UnknownTag(_) => "unknown_tag",
            Self::EmptyField(_) => "empty_field",
            Self::FieldTooLong { .. } => "field_too_long",
            Self::RecipeNotFound(_) => "recipe_not_found",
            Self::UserNotFound(_) => "user_not_found",
            Self::Forbidden => "forbidden",
            Self::Storage(_) => "internal_error",
        }
    }

    /// True for failures of the validation pass that runs before any write.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount { .. }
                | Self::InvalidCookingTime { .. }
                | Self::DuplicateIngredientInRecipe(_)
                | Self::EmptyIngredientList
                | Self::UnknownIngredient(_)
                | Self::UnknownTag(_)
                | Self::EmptyField(_)
                | Self::FieldTooLong { .. }
        )
    }
}
