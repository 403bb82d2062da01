//! Lifecycle states for source documents and annotation documents.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding lookup table (`source_document_states`,
//! `annotation_document_states`, `permission_levels`).

use crate::error::CoreError;

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Resolve a database status ID.
            pub fn from_id(id: StatusId) -> Result<Self, CoreError> {
                match id {
                    $( $val => Ok(Self::$variant), )+
                    other => Err(CoreError::InvariantViolation(format!(
                        "Unknown {} id {other}",
                        stringify!($name)
                    ))),
                }
            }

            /// Name stored in the lookup table.
            pub fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )+
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Progress of one user on one source document.
    AnnotationDocumentState {
        New = 1 => "new",
        InProgress = 2 => "in_progress",
        Finished = 3 => "finished",
        /// Excluded from expected counts and from annotatable listings.
        Ignore = 4 => "ignore",
    }
}

define_status_enum! {
    /// Lifecycle of an uploaded source document across all users.
    SourceDocumentState {
        New = 1 => "new",
        AnnotationInProgress = 2 => "annotation_in_progress",
        AnnotationFinished = 3 => "annotation_finished",
        CurationInProgress = 4 => "curation_in_progress",
        CurationFinished = 5 => "curation_finished",
    }
}

define_status_enum! {
    /// Project permission level. Holders of `User` are the project's annotators.
    PermissionLevel {
        Admin = 1 => "admin",
        Curator = 2 => "curator",
        User = 3 => "user",
    }
}

impl AnnotationDocumentState {
    /// Whether an explicit transition from `self` to `next` is allowed.
    ///
    /// `Ignore` is reachable from anywhere; nothing leaves `Ignore` or moves
    /// a `Finished` record back to work.
    pub fn can_transition_to(self, next: Self) -> bool {
        use AnnotationDocumentState::*;
        match (self, next) {
            (_, Ignore) => true,
            (Ignore, _) => false,
            (a, b) if a == b => true,
            (New, InProgress) | (New, Finished) | (InProgress, Finished) => true,
            _ => false,
        }
    }

    /// Checked variant of [`can_transition_to`](Self::can_transition_to).
    pub fn transition_to(self, next: Self) -> Result<Self, CoreError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::Validation(format!(
                "Annotation document cannot move from '{}' to '{}'",
                self.name(),
                next.name()
            )))
        }
    }

    /// State after a timestamp-updating write. Never regresses.
    pub fn after_write(self) -> Self {
        match self {
            Self::New | Self::InProgress => Self::InProgress,
            other => other,
        }
    }
}

/// Named transitions of a source document's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceDocumentStateTransition {
    NewToAnnotationInProgress,
    AnnotationInProgressToAnnotationFinished,
    AnnotationFinishedToAnnotationInProgress,
    AnnotationInProgressToCurationInProgress,
    CurationInProgressToCurationFinished,
    CurationFinishedToCurationInProgress,
}

impl SourceDocumentStateTransition {
    /// State the transition starts from.
    pub fn from_state(self) -> SourceDocumentState {
        use SourceDocumentState::*;
        match self {
            Self::NewToAnnotationInProgress => New,
            Self::AnnotationInProgressToAnnotationFinished => AnnotationInProgress,
            Self::AnnotationFinishedToAnnotationInProgress => AnnotationFinished,
            Self::AnnotationInProgressToCurationInProgress => AnnotationInProgress,
            Self::CurationInProgressToCurationFinished => CurationInProgress,
            Self::CurationFinishedToCurationInProgress => CurationFinished,
        }
    }

    /// State the transition ends in.
    pub fn to_state(self) -> SourceDocumentState {
        use SourceDocumentState::*;
        match self {
            Self::NewToAnnotationInProgress => AnnotationInProgress,
            Self::AnnotationInProgressToAnnotationFinished => AnnotationFinished,
            Self::AnnotationFinishedToAnnotationInProgress => AnnotationInProgress,
            Self::AnnotationInProgressToCurationInProgress => CurationInProgress,
            Self::CurationInProgressToCurationFinished => CurationFinished,
            Self::CurationFinishedToCurationInProgress => CurationInProgress,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn ids_match_seed_order() {
        assert_eq!(AnnotationDocumentState::New.id(), 1);
        assert_eq!(AnnotationDocumentState::Ignore.id(), 4);
        assert_eq!(SourceDocumentState::CurationFinished.id(), 5);
        assert_eq!(PermissionLevel::User.id(), 3);
    }

    #[test]
    fn from_id_rejects_unknown() {
        assert_eq!(
            AnnotationDocumentState::from_id(3).unwrap(),
            AnnotationDocumentState::Finished
        );
        assert_matches!(
            AnnotationDocumentState::from_id(9),
            Err(CoreError::InvariantViolation(_))
        );
    }

    #[test]
    fn forward_path_allowed() {
        use AnnotationDocumentState::*;
        assert!(New.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Finished));
        assert!(New.can_transition_to(Finished));
    }

    #[test]
    fn ignore_reachable_from_anywhere() {
        use AnnotationDocumentState::*;
        for state in [New, InProgress, Finished, Ignore] {
            assert!(state.can_transition_to(Ignore), "{state:?}");
        }
    }

    #[test]
    fn finished_does_not_regress() {
        use AnnotationDocumentState::*;
        assert!(!Finished.can_transition_to(InProgress));
        assert!(!Finished.can_transition_to(New));
        assert_matches!(Finished.transition_to(InProgress), Err(CoreError::Validation(_)));
    }

    #[test]
    fn ignore_is_terminal() {
        use AnnotationDocumentState::*;
        assert!(!Ignore.can_transition_to(New));
        assert!(!Ignore.can_transition_to(InProgress));
    }

    #[test]
    fn after_write_is_monotonic() {
        use AnnotationDocumentState::*;
        assert_eq!(New.after_write(), InProgress);
        assert_eq!(InProgress.after_write(), InProgress);
        assert_eq!(Finished.after_write(), Finished);
        assert_eq!(Ignore.after_write(), Ignore);
    }

    #[test]
    fn source_transition_endpoints() {
        let t = SourceDocumentStateTransition::NewToAnnotationInProgress;
        assert_eq!(t.from_state(), SourceDocumentState::New);
        assert_eq!(t.to_state(), SourceDocumentState::AnnotationInProgress);
    }
}
