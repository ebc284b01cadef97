// Surveys: listing, authoring, and validated responses
use std::collections::HashMap;

use crate::auth::UserContext;
use crate::error::{ClientError, ClientResult};
use crate::gateway::{DynSurveyApi, SurveyDraft, SurveySubmission};
use crate::model::{
    OptionId, QuestionId, QuestionKind, Survey, SurveyAnswer, SurveyId, SurveyStatus,
};
use crate::store::{Action, Store};

/// What the respondent picked or typed for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerInput {
    Text(String),
    Choice(OptionId),
}

/// Check `answers` against the survey's questions and build the wire answers,
/// in question order.
pub fn build_answers(
    survey: &Survey,
    answers: &HashMap<QuestionId, AnswerInput>,
) -> ClientResult<Vec<SurveyAnswer>> {
    if survey.status == SurveyStatus::Closed {
        return Err(ClientError::Validation("This survey is closed.".into()));
    }
    if survey.user_has_responded {
        return Err(ClientError::Validation(
            "You have already answered this survey.".into(),
        ));
    }

    survey
        .questions
        .iter()
        .enumerate()
        .map(|(i, question)| {
            let missing = || {
                ClientError::Validation(format!("Please answer question {}.", i + 1))
            };
            match (question.question_type, answers.get(&question.id)) {
                (QuestionKind::Text, Some(AnswerInput::Text(text))) if !text.trim().is_empty() => {
                    Ok(SurveyAnswer {
                        question: question.id,
                        text_answer: Some(text.trim().to_string()),
                        option: None,
                    })
                }
                (QuestionKind::MultipleChoice, Some(AnswerInput::Choice(option))) => {
                    if !question.options.iter().any(|o| o.id == *option) {
                        return Err(ClientError::Validation(format!(
                            "Option {option} does not belong to question {}.",
                            i + 1
                        )));
                    }
                    Ok(SurveyAnswer {
                        question: question.id,
                        text_answer: None,
                        option: Some(*option),
                    })
                }
                _ => Err(missing()),
            }
        })
        .collect()
}

fn validate_draft(draft: &SurveyDraft) -> ClientResult<()> {
    if draft.title.trim().is_empty() {
        return Err(ClientError::Validation("Survey title cannot be empty.".into()));
    }
    if draft.questions.is_empty() {
        return Err(ClientError::Validation("Add at least one question.".into()));
    }
    for (i, question) in draft.questions.iter().enumerate() {
        if question.text.trim().is_empty() {
            return Err(ClientError::Validation(format!(
                "Question {} has no text.",
                i + 1
            )));
        }
        if question.question_type == QuestionKind::MultipleChoice && question.options.len() < 2 {
            return Err(ClientError::Validation(format!(
                "Question {} needs at least two options.",
                i + 1
            )));
        }
    }
    Ok(())
}

pub struct SurveyService {
    api: DynSurveyApi,
    store: Store,
    context: UserContext,
}

impl SurveyService {
    pub fn new(api: DynSurveyApi, store: Store, context: UserContext) -> Self {
        Self {
            api,
            store,
            context,
        }
    }

    pub async fn list(&self) -> ClientResult<Vec<Survey>> {
        let surveys = self.api.surveys().await?;
        self.store.dispatch(Action::SetSurveys(surveys.clone()));
        Ok(surveys)
    }

    pub async fn detail(&self, id: SurveyId) -> ClientResult<Survey> {
        self.api.survey(id).await
    }

    pub async fn create(&self, draft: &SurveyDraft) -> ClientResult<Survey> {
        self.context.require()?;
        validate_draft(draft)?;
        let survey = self.api.create_survey(draft).await?;
        tracing::info!(survey = %survey.id, "Survey created");
        self.store.dispatch(Action::AddSurvey(survey.clone()));
        Ok(survey)
    }

    pub async fn update(&self, id: SurveyId, draft: &SurveyDraft) -> ClientResult<Survey> {
        self.context.require()?;
        validate_draft(draft)?;
        let survey = self.api.update_survey(id, draft).await?;
        self.store.dispatch(Action::UpdateSurvey(survey.clone()));
        Ok(survey)
    }

    pub async fn delete(&self, id: SurveyId) -> ClientResult<()> {
        self.context.require()?;
        self.api.delete_survey(id).await?;
        tracing::info!(survey = %id, "Survey deleted");
        self.store.dispatch(Action::DeleteSurvey(id));
        Ok(())
    }

    /// Validate and send a response, then mark the survey answered.
    pub async fn submit(
        &self,
        id: SurveyId,
        answers: &HashMap<QuestionId, AnswerInput>,
    ) -> ClientResult<()> {
        self.context.require()?;
        let survey = match self.store.read(|s| s.surveys.iter().find(|x| x.id == id).cloned()) {
            Some(survey) => survey,
            None => self.api.survey(id).await?,
        };

        let submission = SurveySubmission {
            survey: id,
            answers: build_answers(&survey, answers)?,
        };
        self.api.submit_response(&submission).await?;
        tracing::info!(survey = %id, answers = submission.answers.len(), "Survey answered");

        self.store.dispatch(Action::UpdateSurvey(Survey {
            user_has_responded: true,
            ..survey
        }));
        Ok(())
    }
}
