//! Syntax tree for the supported Java subset.
//!
//! The tree is built once by the parser and read by the translator; nodes own
//! their children exclusively and carry no parent pointers or source spans.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimitiveKind {
    Int,
    Long,
    Short,
    Byte,
    Float,
    Double,
    Boolean,
    Char,
    Void,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Void => "void",
        }
    }
}

/// A Java type as written in source, with generic arguments preserved.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeName {
    Primitive(PrimitiveKind),
    Class { name: String, args: Vec<TypeName> },
    Array(Box<TypeName>),
}

impl TypeName {
    /// The normalized Java spelling: no whitespace around `<>[]`, a single
    /// space after commas. `List < String > []` and `List<String>[]` display
    /// identically.
    pub fn display_name(&self) -> String {
        match self {
            TypeName::Primitive(p) => p.as_str().to_string(),
            TypeName::Class { name, args } => {
                if args.is_empty() {
                    name.clone()
                } else {
                    let args: Vec<String> = args.iter().map(|a| a.display_name()).collect();
                    format!("{}<{}>", name, args.join(", "))
                }
            }
            TypeName::Array(inner) => format!("{}[]", inner.display_name()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    PackagePrivate,
    Private,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Modifiers {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
}

impl Default for Modifiers {
    fn default() -> Self {
        Modifiers {
            visibility: Visibility::PackagePrivate,
            is_static: false,
            is_final: false,
            is_abstract: false,
        }
    }
}

/// Root of the tree: one parsed source file.
#[derive(Clone, Debug, PartialEq)]
pub struct CompilationUnit {
    pub classes: Vec<ClassDecl>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassDecl {
    pub modifiers: Modifiers,
    pub name: String,
    pub extends: Option<String>,
    pub members: Vec<Member>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
    Constructor(ConstructorDecl),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDecl {
    pub modifiers: Modifiers,
    pub ty: TypeName,
    pub name: String,
    pub init: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MethodDecl {
    pub modifiers: Modifiers,
    pub return_type: TypeName,
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConstructorDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub ty: TypeName,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwitchCase {
    pub labels: Vec<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CatchClause {
    pub exception_types: Vec<TypeName>,
    pub var_name: String,
    pub body: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    LocalDecl {
        ty: TypeName,
        name: String,
        init: Option<Expr>,
    },
    ExprStmt(Expr),
    Return(Option<Expr>),
    If {
        condition: Expr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    DoWhile {
        body: Vec<Stmt>,
        condition: Expr,
    },
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        update: Option<Expr>,
        body: Vec<Stmt>,
    },
    ForEach {
        var: Param,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    Switch {
        scrutinee: Expr,
        cases: Vec<SwitchCase>,
        default_body: Option<Vec<Stmt>>,
    },
    Try {
        body: Vec<Stmt>,
        catches: Vec<CatchClause>,
        finally_body: Option<Vec<Stmt>>,
    },
    Throw(Expr),
    Break,
    Continue,
    Block(Vec<Stmt>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    Ushr,
    BitAnd,
    BitOr,
    BitXor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    BitNot,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    IntLiteral(i64),
    LongLiteral(i64),
    FloatLiteral(f64),
    DoubleLiteral(f64),
    StringLiteral(String),
    CharLiteral(char),
    BoolLiteral(bool),
    NullLiteral,
    Ident(String),
    This,
    Super,
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Comparison {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    LogicalAnd(Box<Expr>, Box<Expr>),
    LogicalOr(Box<Expr>, Box<Expr>),
    LogicalNot(Box<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    PreIncrement(Box<Expr>),
    PreDecrement(Box<Expr>),
    PostIncrement(Box<Expr>),
    PostDecrement(Box<Expr>),
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    CompoundAssign {
        op: BinOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    MethodCall {
        object: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
    },
    FieldAccess {
        object: Box<Expr>,
        name: String,
    },
    ArrayAccess {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    NewObject {
        ty: TypeName,
        args: Vec<Expr>,
    },
    NewArray {
        element_type: TypeName,
        size: Box<Expr>,
    },
    NewArrayInit {
        element_type: TypeName,
        elements: Vec<Expr>,
    },
    ArrayInit(Vec<Expr>),
    Cast {
        ty: TypeName,
        operand: Box<Expr>,
    },
    Instanceof {
        operand: Box<Expr>,
        ty: TypeName,
    },
    /// `this(...)` constructor delegation, only meaningful inside a
    /// constructor body.
    ThisCall(Vec<Expr>),
    /// `super(...)` constructor chain, only meaningful inside a constructor
    /// body.
    SuperCall(Vec<Expr>),
}
