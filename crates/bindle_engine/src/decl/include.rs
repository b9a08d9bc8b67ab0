/// Which property values are written when encoding.
///
/// Declared per bean with [`BeanBuilder::include`](super::BeanBuilder::include)
/// and per property with [`AccessorDecl::include`](super::AccessorDecl::include);
/// the property wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Include {
    /// Every value, nulls included.
    Always,
    /// Leaves out nulls and unfilled managed references.
    NonNull,
    /// Also leaves out empty strings, lists and maps.
    #[default]
    NonEmpty,
}
