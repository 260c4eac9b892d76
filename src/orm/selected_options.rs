//! SeaORM Entity for selected_options table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "selected_options")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub response_id: i32,
    pub question_option_id: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::responses::Entity",
        from = "Column::ResponseId",
        to = "super::responses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Response,
    #[sea_orm(
        belongs_to = "super::question_options::Entity",
        from = "Column::QuestionOptionId",
        to = "super::question_options::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    QuestionOption,
}

impl Related<super::responses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Response.def()
    }
}

impl Related<super::question_options::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QuestionOption.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
