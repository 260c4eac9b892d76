//! SeaORM Entity for questions table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "questions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub survey_id: i32,
    #[sea_orm(column_type = "Text")]
    pub prompt: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::surveys::Entity",
        from = "Column::SurveyId",
        to = "super::surveys::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Survey,
    #[sea_orm(has_many = "super::question_options::Entity")]
    QuestionOptions,
    #[sea_orm(has_many = "super::answers::Entity")]
    Answers,
}

impl Related<super::surveys::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Survey.def()
    }
}

impl Related<super::question_options::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QuestionOptions.def()
    }
}

impl Related<super::answers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Answers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
