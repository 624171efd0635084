use bumpalo::Bump;

/// Bump arena the AST is allocated into. Nodes hand out `&'ast` references,
/// which makes sub-tree sharing free; everything is released at once when the
/// backing `Bump` drops.
pub struct AstArena<'ast> {
    allocator: &'ast Bump,
}

impl<'ast> AstArena<'ast> {
    pub fn new(allocator: &'ast Bump) -> Self {
        Self { allocator }
    }

    #[inline(always)]
    pub fn alloc<T>(&self, value: T) -> &'ast T {
        self.allocator.alloc(value)
    }

    #[inline(always)]
    pub fn alloc_vec<T>(&self, values: Vec<T>) -> &'ast [T] {
        self.allocator.alloc_slice_fill_iter(values)
    }
}
