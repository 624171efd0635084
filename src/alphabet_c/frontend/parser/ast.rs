use crate::alphabet_c::frontend::lexer::token::Token;

/// Expression nodes. Children are arena references, so sub-trees can be
/// shared freely and everything is freed when the arena drops.
#[derive(Debug, Clone)]
pub enum Expr<'ast> {
    Binary(BinaryExpr<'ast>),
    Unary(UnaryExpr<'ast>),
    Literal(LiteralExpr<'ast>),
    Grouping(GroupingExpr<'ast>),
    Variable(VariableExpr<'ast>),
    Assign(AssignExpr<'ast>),
    Logical(LogicalExpr<'ast>),
    Call(CallExpr<'ast>),
    Get(GetExpr<'ast>),
    Set(SetExpr<'ast>),
    New(NewExpr<'ast>),
    List(ListExpr<'ast>),
    Map(MapExpr<'ast>),
    Index(IndexExpr<'ast>),
}

#[derive(Debug, Clone)]
pub struct BinaryExpr<'ast> {
    pub left: &'ast Expr<'ast>,
    pub op: Token<'ast>,
    pub right: &'ast Expr<'ast>,
}

#[derive(Debug, Clone)]
pub struct UnaryExpr<'ast> {
    pub op: Token<'ast>,
    pub right: &'ast Expr<'ast>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiteralValue<'ast> {
    Null,
    Number(f64),
    Str(&'ast str),
}

#[derive(Debug, Clone)]
pub struct LiteralExpr<'ast> {
    pub value: LiteralValue<'ast>,
}

#[derive(Debug, Clone)]
pub struct GroupingExpr<'ast> {
    pub expression: &'ast Expr<'ast>,
}

#[derive(Debug, Clone)]
pub struct VariableExpr<'ast> {
    pub name: Token<'ast>,
}

#[derive(Debug, Clone)]
pub struct AssignExpr<'ast> {
    pub name: Token<'ast>,
    pub value: &'ast Expr<'ast>,
}

#[derive(Debug, Clone)]
pub struct LogicalExpr<'ast> {
    pub left: &'ast Expr<'ast>,
    pub op: Token<'ast>,
    pub right: &'ast Expr<'ast>,
}

#[derive(Debug, Clone)]
pub struct CallExpr<'ast> {
    pub callee: &'ast Expr<'ast>,
    pub arguments: &'ast [&'ast Expr<'ast>],
}

/// Property access: `obj.name`.
#[derive(Debug, Clone)]
pub struct GetExpr<'ast> {
    pub object: &'ast Expr<'ast>,
    pub name: Token<'ast>,
}

/// Property assignment: `obj.name = value`.
#[derive(Debug, Clone)]
pub struct SetExpr<'ast> {
    pub object: &'ast Expr<'ast>,
    pub name: Token<'ast>,
    pub value: &'ast Expr<'ast>,
}

/// Instantiation: `n ClassName(args)`.
#[derive(Debug, Clone)]
pub struct NewExpr<'ast> {
    pub name: Token<'ast>,
    pub arguments: &'ast [&'ast Expr<'ast>],
}

#[derive(Debug, Clone)]
pub struct ListExpr<'ast> {
    pub elements: &'ast [&'ast Expr<'ast>],
}

#[derive(Debug, Clone)]
pub struct MapExpr<'ast> {
    pub keys: &'ast [&'ast Expr<'ast>],
    pub values: &'ast [&'ast Expr<'ast>],
}

/// Index access: `obj[index]`.
#[derive(Debug, Clone)]
pub struct IndexExpr<'ast> {
    pub object: &'ast Expr<'ast>,
    pub index: &'ast Expr<'ast>,
}

/// Statement nodes.
#[derive(Debug, Clone)]
pub enum Stmt<'ast> {
    Expression(ExpressionStmt<'ast>),
    Var(VarStmt<'ast>),
    Block(BlockStmt<'ast>),
    If(IfStmt<'ast>),
    Loop(LoopStmt<'ast>),
    Try(TryStmt<'ast>),
    Return(ReturnStmt<'ast>),
    Function(FunctionStmt<'ast>),
    Class(ClassStmt<'ast>),
}

#[derive(Debug, Clone)]
pub struct ExpressionStmt<'ast> {
    pub expression: &'ast Expr<'ast>,
}

/// `TYPE_ID name = initializer`, also used for fields and parameters.
#[derive(Debug, Clone)]
pub struct VarStmt<'ast> {
    pub type_id: Token<'ast>,
    pub name: Token<'ast>,
    pub initializer: Option<&'ast Expr<'ast>>,
    pub visibility: Option<Token<'ast>>,
    pub is_static: bool,
}

#[derive(Debug, Clone)]
pub struct BlockStmt<'ast> {
    pub statements: &'ast [&'ast Stmt<'ast>],
}

#[derive(Debug, Clone)]
pub struct IfStmt<'ast> {
    pub condition: &'ast Expr<'ast>,
    pub then_branch: &'ast Stmt<'ast>,
    pub else_branch: Option<&'ast Stmt<'ast>>,
}

#[derive(Debug, Clone)]
pub struct LoopStmt<'ast> {
    pub condition: &'ast Expr<'ast>,
    pub body: &'ast Stmt<'ast>,
}

/// `t { ... } h (TYPE_ID name) { ... }`
#[derive(Debug, Clone)]
pub struct TryStmt<'ast> {
    pub try_block: BlockStmt<'ast>,
    pub exception_type: Token<'ast>,
    pub exception_var: Token<'ast>,
    pub handle_block: BlockStmt<'ast>,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt<'ast> {
    pub keyword: Token<'ast>,
    pub value: Option<&'ast Expr<'ast>>,
}

/// Method declaration. Interface signatures reuse this with an empty body.
#[derive(Debug, Clone)]
pub struct FunctionStmt<'ast> {
    pub name: Token<'ast>,
    pub params: &'ast [VarStmt<'ast>],
    pub body: &'ast [&'ast Stmt<'ast>],
    pub return_type: Token<'ast>,
    pub visibility: Option<Token<'ast>>,
    pub is_static: bool,
}

/// Class declaration. Interfaces reuse this variant with `is_interface` set
/// and empty fields.
#[derive(Debug, Clone)]
pub struct ClassStmt<'ast> {
    pub name: Token<'ast>,
    pub superclass: Option<Token<'ast>>,
    pub methods: &'ast [FunctionStmt<'ast>],
    pub fields: &'ast [VarStmt<'ast>],
    pub interfaces: &'ast [Token<'ast>],
    pub is_interface: bool,
}
