//! Binding and validation of submitted forms, and the form descriptions
//! handed to templates.

use crate::server::ServerError;
use axum::{
    Form,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::{Validate, ValidationError, ValidationErrors};
use yatube_common::model::{
    Id,
    group::{Group, GroupMarker},
    user::Username,
};

pub const NON_FIELD_ERRORS: &str = "__all__";

const INVALID_CHOICE_MESSAGE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
const INVALID_IMAGE_MESSAGE: &str = "Upload a valid image. \
    The file you uploaded was either not an image or a corrupted image.";

/// Error messages by field name. Errors not tied to one field are stored
/// under [`NON_FIELD_ERRORS`].
#[derive(Clone, Eq, PartialEq, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[], Vec::as_slice)
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut form_errors = Self::default();

        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map_or_else(|| error.code.to_string(), ToString::to_string);
                form_errors.add(field.to_string(), message);
            }
        }

        form_errors
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Widget {
    Text,
    Textarea,
    Select,
    File,
    Password,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub widget: Widget,
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
}

impl FormField {
    fn new(name: &'static str, label: &'static str, widget: Widget, required: bool) -> Self {
        Self {
            name,
            label,
            widget,
            required,
            choices: Vec::new(),
        }
    }
}

/// Everything a template needs to draw a form: its fields, the values to
/// pre-fill and the errors of the last submission.
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct FormContext<V> {
    pub fields: Vec<FormField>,
    pub values: V,
    pub errors: FormErrors,
}

// Post form

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

impl UploadedFile {
    #[must_use]
    pub fn image_format(&self) -> Option<ImageFormat> {
        image::guess_format(&self.bytes).ok().filter(|format| {
            matches!(
                format,
                ImageFormat::Gif | ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP
            )
        })
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Serialize)]
pub struct PostFormValues {
    pub text: String,
    pub group: Option<String>,
    /// The image currently attached to the post, when editing.
    pub image: Option<String>,
}

/// A post form as submitted, either `multipart/form-data` (needed for image
/// uploads) or `application/x-www-form-urlencoded`.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct PostSubmission {
    pub text: String,
    pub group: String,
    pub image: Option<UploadedFile>,
    pub image_clear: bool,
}

/// A submission that passed validation.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct CleanedPost {
    pub text: String,
    pub group: Option<Id<GroupMarker>>,
    pub image: Option<UploadedFile>,
    pub image_clear: bool,
}

#[derive(Validate)]
struct PostText {
    #[validate(length(min = 1, message = "This field is required."))]
    text: String,
}

#[derive(Deserialize)]
struct PostFormFields {
    #[serde(default)]
    text: String,
    #[serde(default)]
    group: String,
    #[serde(default, rename = "image-clear")]
    image_clear: Option<String>,
}

fn checkbox_checked(value: &str) -> bool {
    !matches!(value.trim(), "" | "0" | "false" | "off")
}

impl PostSubmission {
    #[must_use]
    pub fn values(&self) -> PostFormValues {
        let group = self.group.trim();

        PostFormValues {
            text: self.text.clone(),
            group: (!group.is_empty()).then(|| group.to_owned()),
            image: None,
        }
    }

    /// Validates the submission against the groups that may be chosen.
    pub fn clean(self, groups: &[Group]) -> Result<CleanedPost, FormErrors> {
        let text = PostText {
            text: self.text.trim().to_owned(),
        };
        let mut errors = text
            .validate()
            .map_or_else(FormErrors::from, |()| FormErrors::default());

        let group = match self.group.trim() {
            "" => None,
            raw => {
                let chosen = raw
                    .parse::<Id<GroupMarker>>()
                    .ok()
                    .filter(|id| groups.iter().any(|group| group.id == *id));
                if chosen.is_none() {
                    errors.add("group", INVALID_CHOICE_MESSAGE);
                }
                chosen
            }
        };

        if self
            .image
            .as_ref()
            .is_some_and(|image| image.image_format().is_none())
        {
            errors.add("image", INVALID_IMAGE_MESSAGE);
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(CleanedPost {
            text: text.text,
            group,
            image: self.image,
            image_clear: self.image_clear,
        })
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ServerError> {
        let mut submission = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();

            match name.as_str() {
                "text" => submission.text = field.text().await?,
                "group" => submission.group = field.text().await?,
                "image-clear" => submission.image_clear = checkbox_checked(&field.text().await?),
                "image" => {
                    let file_name = field.file_name().unwrap_or_default().to_owned();
                    let bytes = field.bytes().await?;

                    // Browsers send an empty part when no file was chosen.
                    if !bytes.is_empty() {
                        submission.image = Some(UploadedFile { file_name, bytes });
                    }
                }
                _ => {}
            }
        }

        Ok(submission)
    }
}

impl<S> FromRequest<S> for PostSubmission
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_multipart(&request) {
            let multipart = Multipart::from_request(request, state).await?;
            return Self::from_multipart(multipart).await;
        }

        let Form(fields) = Form::<PostFormFields>::from_request(request, state).await?;
        Ok(Self {
            text: fields.text,
            group: fields.group,
            image: None,
            image_clear: fields.image_clear.as_deref().is_some_and(checkbox_checked),
        })
    }
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

#[must_use]
pub fn post_form(
    groups: &[Group],
    values: PostFormValues,
    errors: FormErrors,
) -> FormContext<PostFormValues> {
    let mut group_field = FormField::new("group", "Group", Widget::Select, false);
    group_field.choices = std::iter::once(Choice {
        value: String::new(),
        label: "---------".to_owned(),
    })
    .chain(groups.iter().map(|group| Choice {
        value: group.id.to_string(),
        label: group.title.clone(),
    }))
    .collect();

    FormContext {
        fields: vec![
            FormField::new("text", "Post text", Widget::Textarea, true),
            group_field,
            FormField::new("image", "Image", Widget::File, false),
        ],
        values,
        errors,
    }
}

// Comment form

#[derive(Clone, Eq, PartialEq, Debug, Default, Deserialize, Serialize, Validate)]
pub struct CommentForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub text: String,
}

impl CommentForm {
    /// Returns the trimmed comment text.
    pub fn clean(mut self) -> Result<String, FormErrors> {
        self.text = self.text.trim().to_owned();
        self.validate()?;
        Ok(self.text)
    }
}

/// Comments arrive urlencoded or as multipart, depending on how the page
/// containing the form was built.
impl<S> FromRequest<S> for CommentForm
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&request) {
            let Form(form) = Form::<Self>::from_request(request, state).await?;
            return Ok(form);
        }

        let mut multipart = Multipart::from_request(request, state).await?;
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            if field.name() == Some("text") {
                form.text = field.text().await?;
            }
        }
        Ok(form)
    }
}

#[must_use]
pub fn comment_form(values: CommentForm, errors: FormErrors) -> FormContext<CommentForm> {
    FormContext {
        fields: vec![FormField::new("text", "Text", Widget::Textarea, true)],
        values,
        errors,
    }
}

// Account forms

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::new("required").with_message("This field is required.".into()));
    }

    if Username::is_valid(username) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid").with_message(
            "Enter a valid username. This value may contain only letters, \
            numbers, and @/./+/-/_ characters."
                .into(),
        ))
    }
}

#[derive(Clone, Default, Deserialize, Validate)]
pub struct SignupForm {
    #[serde(default)]
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(
        min = 8,
        message = "This password is too short. It must contain at least 8 characters."
    ))]
    pub password1: String,
    #[serde(default)]
    #[validate(must_match(other = "password1", message = "The two password fields didn't match."))]
    pub password2: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Serialize)]
pub struct SignupValues {
    pub username: String,
}

impl SignupForm {
    pub fn clean(mut self) -> Result<(Username, String), (SignupValues, FormErrors)> {
        self.username = self.username.trim().to_owned();
        let values = SignupValues {
            username: self.username.clone(),
        };

        if let Err(errors) = self.validate() {
            return Err((values, errors.into()));
        }

        match Username::new(self.username) {
            Ok(username) => Ok((username, self.password1)),
            Err(err) => {
                let mut errors = FormErrors::default();
                errors.add("username", err.to_string());
                Err((values, errors))
            }
        }
    }
}

#[must_use]
pub fn signup_form(values: SignupValues, errors: FormErrors) -> FormContext<SignupValues> {
    FormContext {
        fields: vec![
            FormField::new("username", "Username", Widget::Text, true),
            FormField::new("password1", "Password", Widget::Password, true),
            FormField::new("password2", "Password confirmation", Widget::Password, true),
        ],
        values,
        errors,
    }
}

#[derive(Clone, Default, Deserialize, Validate)]
pub struct LoginForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Serialize)]
pub struct LoginValues {
    pub username: String,
}

#[must_use]
pub fn login_form(values: LoginValues, errors: FormErrors) -> FormContext<LoginValues> {
    FormContext {
        fields: vec![
            FormField::new("username", "Username", Widget::Text, true),
            FormField::new("password", "Password", Widget::Password, true),
        ],
        values,
        errors,
    }
}
