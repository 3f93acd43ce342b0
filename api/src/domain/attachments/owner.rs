/// Anything files can be attached to. Implementors only expose the pair the
/// attachment store is keyed by; the resolver never touches the owner itself.
pub trait AttachmentOwner {
    /// Category tag, usually the owner's table name.
    fn object_type(&self) -> &str;
    /// `None` while the owner has not been persisted yet.
    fn object_id(&self) -> Option<i64>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRef {
    pub object_type: String,
    pub object_id: Option<i64>,
}

impl OwnerRef {
    pub fn new(object_type: impl Into<String>, object_id: i64) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: Some(object_id),
        }
    }

    pub fn pending(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: None,
        }
    }

    pub fn of<O: AttachmentOwner + ?Sized>(owner: &O) -> Self {
        Self {
            object_type: owner.object_type().to_string(),
            object_id: owner.object_id(),
        }
    }
}

impl AttachmentOwner for OwnerRef {
    fn object_type(&self) -> &str {
        &self.object_type
    }

    fn object_id(&self) -> Option<i64> {
        self.object_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Post {
        id: Option<i64>,
    }

    impl AttachmentOwner for Post {
        fn object_type(&self) -> &str {
            "posts"
        }

        fn object_id(&self) -> Option<i64> {
            self.id
        }
    }

    #[test]
    fn owner_ref_copies_type_and_id() {
        let saved = OwnerRef::of(&Post { id: Some(42) });
        assert_eq!(saved, OwnerRef::new("posts", 42));

        let draft = OwnerRef::of(&Post { id: None });
        assert_eq!(draft, OwnerRef::pending("posts"));
    }
}
