use std::collections::HashSet;

use crate::DomainResult;
use crate::ports::BoxFuture;
use crate::questions::{GlobalQuestion, Question};

pub trait GlobalQuestionRepository: Send + Sync {
    fn create(&self, question: &GlobalQuestion) -> BoxFuture<'_, DomainResult<GlobalQuestion>>;

    fn get(&self, global_question_id: &str)
    -> BoxFuture<'_, DomainResult<Option<GlobalQuestion>>>;

    /// First document whose id is not excluded, under store order. Not a
    /// uniform random pick.
    fn first_with_except(
        &self,
        except_ids: &HashSet<String>,
    ) -> BoxFuture<'_, DomainResult<Option<GlobalQuestion>>>;

    /// All documents not excluded by id; an empty category set means no
    /// category filter.
    fn list_with_except(
        &self,
        except_ids: &HashSet<String>,
        categories: &HashSet<String>,
    ) -> BoxFuture<'_, DomainResult<Vec<GlobalQuestion>>>;
}

pub trait QuestionRepository: Send + Sync {
    fn create(&self, question: &Question) -> BoxFuture<'_, DomainResult<Question>>;

    fn get(&self, question_id: &str) -> BoxFuture<'_, DomainResult<Option<Question>>>;

    /// Full-document replace. NotFound when the id does not resolve.
    fn update(
        &self,
        question_id: &str,
        question: &Question,
    ) -> BoxFuture<'_, DomainResult<Question>>;

    fn list_for_user(&self, user_id: &str) -> BoxFuture<'_, DomainResult<Vec<Question>>>;
}
