use crate::command::{check_document, downcast_command, Command, CommandKind};
use crate::document::Document;
use crate::entity::EntityId;
use crate::meta::Meta;
use std::any::Any;
use uuid::Uuid;

/// 重命名任意带有 [`Meta`] 的实体，连续重命名同一实体时合并
#[derive(Debug)]
pub struct RenameCommand {
    document_id: Uuid,
    entity: EntityId,
    name: String,
    previous: Option<String>,
}

impl RenameCommand {
    pub fn new(document: &Document, entity: EntityId, name: impl Into<String>) -> Self {
        assert!(
            document.registry().has::<Meta>(entity),
            "entity {entity} has no metadata"
        );
        Self {
            document_id: document.uuid(),
            entity,
            name: name.into(),
            previous: None,
        }
    }
}

impl Command for RenameCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::Rename
    }

    fn text(&self) -> &str {
        "Rename"
    }

    fn apply(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        let meta = document.registry_mut().get_mut::<Meta>(self.entity);
        let previous = std::mem::replace(&mut meta.name, self.name.clone());
        if self.previous.is_none() {
            self.previous = Some(previous);
        }
    }

    fn undo(&mut self, document: &mut Document) {
        check_document(self.document_id, document);

        if let Some(previous) = &self.previous {
            document.registry_mut().get_mut::<Meta>(self.entity).name = previous.clone();
        }
    }

    fn merge_with(&mut self, other: &dyn Command) -> bool {
        match downcast_command::<Self>(other, self.kind()) {
            Some(other) if other.document_id == self.document_id && other.entity == self.entity => {
                self.name = other.name.clone();
                true
            }
            _ => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
