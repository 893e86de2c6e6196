//! The abstract syntax tree produced by the parser.
//!
//! This is the contract the logical planner lowers from (§4.1). Parsing
//! itself is treated as an external collaborator per §1 of the
//! specification; this AST is the narrow surface the planner actually
//! consumes.

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Query(QueryNode),
    Explain(Box<Statement>),
    ShowColumns { table: Vec<String> },
    ShowCreate { table: Vec<String> },
    ShowVariable { name: String },
    ShowFunctions,
    Set { name: String, value: Expr, session: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryNode {
    pub select: SelectNode,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectNode {
    pub distinct: Option<Vec<Expr>>,
    pub projection: Vec<SelectItem>,
    pub from: Vec<TableWithJoins>,
    pub selection: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    UnnamedExpr(Expr),
    ExprWithAlias(Expr, String),
    Wildcard,
    QualifiedWildcard(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expr,
    pub asc: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableWithJoins {
    pub relation: TableFactor,
    pub joins: Vec<Join>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableFactor {
    Table {
        name: Vec<String>,
        alias: Option<String>,
        hints: Vec<String>,
        temporal: Option<TemporalFilter>,
    },
    Derived {
        subquery: Box<QueryNode>,
        alias: Option<String>,
    },
    Function {
        name: String,
        args: Vec<FunctionArg>,
        alias: Option<String>,
        columns: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemporalFilter {
    Today,
    Yesterday,
    AsOf(Expr),
    Between(Expr, Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub relation: TableFactor,
    pub operator: JoinOperator,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinOperator {
    Inner(JoinConstraint),
    LeftOuter(JoinConstraint),
    RightOuter(JoinConstraint),
    FullOuter(JoinConstraint),
    Cross,
    CrossJoinUnnest { unnest_column: Expr },
    Natural(NaturalKind),
    LeftSemi(JoinConstraint),
    RightSemi(JoinConstraint),
    LeftAnti(JoinConstraint),
    RightAnti(JoinConstraint),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaturalKind {
    Inner,
    Left,
    Right,
    Full,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinConstraint {
    On(Expr),
    Using(Vec<String>),
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionArg {
    Expr(Expr),
    Wildcard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    StringConcat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    Cast,
    TryCast,
    SafeCast,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(String),
    SingleQuotedString(String),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident {
        source: Option<String>,
        column: String,
    },
    Literal(Literal),
    Placeholder(usize),
    UnaryMinus(Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Xor(Box<Expr>, Box<Expr>),
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    Comparison {
        left: Box<Expr>,
        op: ComparisonOperator,
        right: Box<Expr>,
    },
    Between {
        expr: Box<Expr>,
        negated: bool,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<QueryNode>,
        negated: bool,
    },
    InUnnest {
        expr: Box<Expr>,
        array_expr: Box<Expr>,
        negated: bool,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
        case_insensitive: bool,
    },
    SimilarTo {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    Cast {
        expr: Box<Expr>,
        data_type: String,
        kind: CastKind,
    },
    Extract {
        field: String,
        expr: Box<Expr>,
    },
    MapAccess {
        expr: Box<Expr>,
        key: Box<Expr>,
    },
    Function {
        name: String,
        args: Vec<FunctionArg>,
        distinct: bool,
    },
    IsNull(Box<Expr>),
    IsNotNull(Box<Expr>),
    IsTrue(Box<Expr>),
    IsFalse(Box<Expr>),
    IsNotTrue(Box<Expr>),
    IsNotFalse(Box<Expr>),
    Nested(Box<Expr>),
    Tuple(Vec<Expr>),
    Wildcard,
    QualifiedWildcard(Vec<String>),
    SessionVariable { name: String, double_at: bool },
    Subquery(Box<QueryNode>),
}
