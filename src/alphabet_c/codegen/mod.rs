pub mod error;

use std::collections::HashMap;
use std::mem;

use miette::SourceSpan;

use crate::alphabet_c::frontend::lexer::token::TokenKind;
use crate::alphabet_c::frontend::parser::ast::{
    ClassStmt, Expr, FunctionStmt, LiteralValue, Stmt,
};
use crate::alphabet_c::type_system::{self, TypeRegistry};
use crate::alphabet_vm::bytecode::{
    CompiledClass, CompiledMethod, Instruction, OpCode, Operand, Program, SYSTEM_RECEIVER,
};
use error::{CompileResult, ReturnTypeMismatchError, TypeMismatchError};

/// Lowers a parsed statement list into a [Program].
///
/// Two passes: the first assigns class IDs (from 15, in source order) and
/// registers them with the type registry; the second type-checks coarse
/// assignment compatibility, compiles every class body, then compiles the
/// remaining top-level statements into the main stream.
pub struct Compiler {
    registry: TypeRegistry,
    class_map: HashMap<String, u16>,
    bytecode: Vec<Instruction>,
    globals: Vec<String>,
    src: String,
}

impl Compiler {
    pub fn new(src: &str) -> Self {
        Self {
            registry: TypeRegistry::new(),
            class_map: HashMap::new(),
            bytecode: Vec::new(),
            globals: Vec::new(),
            src: src.to_string(),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn compile(&mut self, statements: &[&Stmt<'_>]) -> CompileResult<Program> {
        for stmt in statements {
            if let Stmt::Class(class) = stmt {
                if !class.is_interface {
                    let id = self.registry.register(class.name.lexeme, Vec::new())?;
                    self.class_map.insert(class.name.lexeme.to_string(), id);
                }
            }
        }

        self.validate_types(statements)?;

        let mut classes = Vec::new();
        for stmt in statements {
            if let Stmt::Class(class) = stmt {
                if !class.is_interface {
                    classes.push(self.compile_class(class));
                }
            }
        }

        self.bytecode.clear();
        for stmt in statements {
            if !matches!(stmt, Stmt::Class(_)) {
                self.emit_stmt(stmt);
            }
        }
        self.emit(OpCode::Halt);

        let mut program = Program {
            main: mem::take(&mut self.bytecode),
            globals: self.globals.clone(),
            ..Program::default()
        };
        for class in classes {
            program.static_init.extend(class.static_init.iter().cloned());
            program.classes.insert(class.id, class);
        }
        tracing::debug!(
            instructions = program.main.len(),
            classes = program.classes.len(),
            globals = program.globals.len(),
            "compiled program"
        );
        Ok(program)
    }

    // === type checking ===

    fn validate_types(&self, statements: &[&Stmt<'_>]) -> CompileResult<()> {
        for stmt in statements {
            match stmt {
                Stmt::Var(var) => {
                    if let Some(initializer) = var.initializer {
                        let declared = var.type_id.literal as u16;
                        let inferred = self.infer_type(initializer);
                        if !self.registry.is_compatible(inferred, declared) {
                            return Err(TypeMismatchError {
                                found: inferred,
                                expected: declared,
                                span: SourceSpan::from(var.name.span),
                                src: self.src.clone(),
                            }
                            .into());
                        }
                    }
                }
                Stmt::Class(class) if !class.is_interface => {
                    for method in class.methods {
                        self.validate_method_returns(method)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn validate_method_returns(&self, method: &FunctionStmt<'_>) -> CompileResult<()> {
        let declared = method.return_type.literal as u16;
        for stmt in method.body {
            if let Stmt::Return(ret) = stmt {
                if let Some(value) = ret.value {
                    let inferred = self.infer_type(value);
                    if !self.registry.is_compatible(inferred, declared) {
                        return Err(ReturnTypeMismatchError {
                            method: method.name.lexeme.to_string(),
                            found: inferred,
                            expected: declared,
                            span: SourceSpan::from(ret.keyword.span),
                            src: self.src.clone(),
                        }
                        .into());
                    }
                }
            }
        }
        Ok(())
    }

    /// Best-effort type inference; anything the rules below do not cover is
    /// a generic i32.
    fn infer_type(&self, expr: &Expr<'_>) -> u16 {
        match expr {
            Expr::Literal(lit) => match lit.value {
                LiteralValue::Null => type_system::I32,
                LiteralValue::Number(_) => type_system::F64,
                LiteralValue::Str(_) => type_system::STR,
            },
            Expr::Binary(bin) => {
                let left = self.infer_type(bin.left);
                let right = self.infer_type(bin.right);
                let is_integer = |id: u16| (type_system::I8..=type_system::INT).contains(&id);
                let is_float = |id: u16| (type_system::F32..=type_system::FLOAT).contains(&id);
                if is_integer(left) && is_integer(right) {
                    left.max(right)
                } else if is_float(left) || is_float(right) {
                    type_system::F64
                } else {
                    type_system::I32
                }
            }
            Expr::Variable(var) => {
                if var.name.lexeme == "z" {
                    return type_system::I32;
                }
                self.class_map
                    .get(var.name.lexeme)
                    .copied()
                    .unwrap_or(type_system::I32)
            }
            Expr::New(new_expr) => self
                .class_map
                .get(new_expr.name.lexeme)
                .copied()
                .unwrap_or(type_system::I32),
            Expr::List(_) => type_system::LIST,
            Expr::Map(_) => type_system::MAP,
            _ => type_system::I32,
        }
    }

    // === emission ===

    fn emit(&mut self, op: OpCode) {
        self.bytecode.push(Instruction::new(op));
    }

    fn emit_with(&mut self, op: OpCode, operand: Operand) {
        self.bytecode.push(Instruction::with(op, operand));
    }

    /// Writes the current emission point into a previously emitted jump
    /// placeholder.
    fn patch_jump(&mut self, index: usize) {
        let target = self.bytecode.len() as i64;
        if let Some(instruction) = self.bytecode.get_mut(index) {
            instruction.operand = Operand::Int(target);
        }
    }

    fn global_index(&mut self, name: &str) -> usize {
        if let Some(index) = self.globals.iter().position(|g| g == name) {
            return index;
        }
        self.globals.push(name.to_string());
        self.globals.len() - 1
    }

    fn emit_stmt(&mut self, stmt: &Stmt<'_>) {
        match stmt {
            Stmt::Expression(s) => {
                self.emit_expr(s.expression);
                self.emit(OpCode::Pop);
            }
            Stmt::Var(s) => {
                match s.initializer {
                    Some(initializer) => self.emit_expr(initializer),
                    None => self.emit_with(OpCode::PushConst, Operand::Null),
                }
                let index = self.global_index(s.name.lexeme);
                self.emit_with(OpCode::StoreVar, Operand::Int(index as i64));
                // StoreVar reads the top without popping
                self.emit(OpCode::Pop);
            }
            Stmt::Block(s) => {
                for inner in s.statements {
                    self.emit_stmt(inner);
                }
            }
            Stmt::If(s) => {
                self.emit_expr(s.condition);
                let false_jump = self.bytecode.len();
                self.emit_with(OpCode::JumpIfFalse, Operand::Int(0));
                self.emit_stmt(s.then_branch);
                if let Some(else_branch) = s.else_branch {
                    let exit_jump = self.bytecode.len();
                    self.emit_with(OpCode::Jump, Operand::Int(0));
                    self.patch_jump(false_jump);
                    self.emit_stmt(else_branch);
                    self.patch_jump(exit_jump);
                } else {
                    self.patch_jump(false_jump);
                }
            }
            Stmt::Loop(s) => {
                let start = self.bytecode.len();
                self.emit_expr(s.condition);
                let exit_jump = self.bytecode.len();
                self.emit_with(OpCode::JumpIfFalse, Operand::Int(0));
                self.emit_stmt(s.body);
                self.emit_with(OpCode::Jump, Operand::Int(start as i64));
                self.patch_jump(exit_jump);
            }
            Stmt::Try(s) => {
                let setup = self.bytecode.len();
                self.emit_with(OpCode::SetupTry, Operand::Int(0));
                for inner in s.try_block.statements {
                    self.emit_stmt(inner);
                }
                self.emit(OpCode::PopTry);
                let exit_jump = self.bytecode.len();
                self.emit_with(OpCode::Jump, Operand::Int(0));

                self.patch_jump(setup);
                let exc_index = self.global_index(s.exception_var.lexeme);
                self.emit_with(OpCode::StoreVar, Operand::Int(exc_index as i64));
                self.emit(OpCode::Pop);
                for inner in s.handle_block.statements {
                    self.emit_stmt(inner);
                }
                self.patch_jump(exit_jump);
            }
            Stmt::Return(s) => {
                match s.value {
                    Some(value) => self.emit_expr(value),
                    None => self.emit_with(OpCode::PushConst, Operand::Null),
                }
                self.emit(OpCode::Ret);
            }
            // classes are compiled separately; bare function statements have
            // no top-level meaning
            Stmt::Class(_) | Stmt::Function(_) => {}
        }
    }

    fn emit_expr(&mut self, expr: &Expr<'_>) {
        match expr {
            Expr::Literal(e) => match e.value {
                LiteralValue::Null => self.emit_with(OpCode::PushConst, Operand::Null),
                LiteralValue::Number(n) => self.emit_with(OpCode::PushConst, Operand::Float(n)),
                LiteralValue::Str(s) => {
                    self.emit_with(OpCode::PushConst, Operand::Str(s.to_string()))
                }
            },
            Expr::Grouping(e) => self.emit_expr(e.expression),
            Expr::Variable(e) => self.emit_variable(e.name.lexeme),
            Expr::Assign(e) => {
                self.emit_expr(e.value);
                match self.globals.iter().position(|g| g == e.name.lexeme) {
                    Some(index) => {
                        self.emit_with(OpCode::StoreVar, Operand::Int(index as i64));
                    }
                    None => {
                        self.emit_with(OpCode::StoreVar, Operand::Str(e.name.lexeme.to_string()));
                    }
                }
            }
            Expr::Binary(e) => {
                self.emit_expr(e.left);
                self.emit_expr(e.right);
                match e.op.kind {
                    TokenKind::Plus => self.emit(OpCode::Add),
                    TokenKind::Minus => self.emit(OpCode::Sub),
                    TokenKind::Star => self.emit(OpCode::Mul),
                    TokenKind::Slash => self.emit(OpCode::Div),
                    TokenKind::Percent => self.emit(OpCode::Percent),
                    TokenKind::EqEq => self.emit(OpCode::Eq),
                    TokenKind::RAngle => self.emit(OpCode::Gt),
                    TokenKind::LAngle => self.emit(OpCode::Lt),
                    // !=, <=, >= have no lowering
                    _ => {}
                }
            }
            Expr::Unary(e) => {
                match e.op.kind {
                    TokenKind::Bang => {
                        self.emit_expr(e.right);
                        self.emit(OpCode::Not);
                    }
                    TokenKind::Minus => {
                        self.emit_with(OpCode::PushConst, Operand::Float(0.0));
                        self.emit_expr(e.right);
                        self.emit(OpCode::Sub);
                    }
                    // unary '@' is reserved and has no lowering
                    _ => self.emit_expr(e.right),
                }
            }
            Expr::Logical(e) => {
                self.emit_expr(e.left);
                if e.op.kind == TokenKind::OpAnd {
                    let false_jump = self.bytecode.len();
                    self.emit_with(OpCode::JumpIfFalse, Operand::Int(0));
                    self.emit_expr(e.right);
                    self.patch_jump(false_jump);
                } else {
                    // left truthy: Not the stack top and skip the right
                    // operand; left falsey: jump ahead and evaluate it
                    let right_jump = self.bytecode.len();
                    self.emit_with(OpCode::JumpIfFalse, Operand::Int(0));
                    self.emit(OpCode::Not);
                    let exit_jump = self.bytecode.len();
                    self.emit_with(OpCode::Jump, Operand::Int(0));
                    self.patch_jump(right_jump);
                    self.emit_expr(e.right);
                    self.patch_jump(exit_jump);
                }
            }
            Expr::Call(e) => match e.callee {
                Expr::Get(get) => {
                    self.emit_expr(get.object);
                    for arg in e.arguments {
                        self.emit_expr(arg);
                    }
                    if get.name.lexeme == "o" {
                        self.emit(OpCode::Print);
                    } else {
                        self.emit_with(
                            OpCode::Call,
                            Operand::Call(get.name.lexeme.to_string(), e.arguments.len()),
                        );
                    }
                }
                Expr::Variable(var) => {
                    for arg in e.arguments {
                        self.emit_expr(arg);
                    }
                    if var.name.lexeme == "z" {
                        self.emit_with(
                            OpCode::PushConst,
                            Operand::Str(SYSTEM_RECEIVER.to_string()),
                        );
                    }
                    self.emit_with(
                        OpCode::Call,
                        Operand::Call(var.name.lexeme.to_string(), e.arguments.len()),
                    );
                }
                _ => {}
            },
            Expr::Get(e) => {
                let static_access = matches!(
                    e.object,
                    Expr::Variable(var) if self.class_map.contains_key(var.name.lexeme)
                );
                self.emit_expr(e.object);
                if static_access {
                    self.emit_with(OpCode::GetStatic, Operand::Str(e.name.lexeme.to_string()));
                } else {
                    self.emit_with(OpCode::LoadField, Operand::Str(e.name.lexeme.to_string()));
                }
            }
            Expr::Set(e) => {
                let static_access = matches!(
                    e.object,
                    Expr::Variable(var) if self.class_map.contains_key(var.name.lexeme)
                );
                self.emit_expr(e.object);
                self.emit_expr(e.value);
                if static_access {
                    self.emit_with(OpCode::SetStatic, Operand::Str(e.name.lexeme.to_string()));
                } else {
                    self.emit_with(OpCode::StoreField, Operand::Str(e.name.lexeme.to_string()));
                }
            }
            Expr::New(e) => {
                // constructor arguments are evaluated for effect and
                // discarded: there is no constructor dispatch
                for arg in e.arguments {
                    self.emit_expr(arg);
                }
                for _ in e.arguments {
                    self.emit(OpCode::Pop);
                }
                self.emit_with(OpCode::New, Operand::Str(e.name.lexeme.to_string()));
            }
            Expr::List(e) => {
                for element in e.elements {
                    self.emit_expr(element);
                }
                self.emit_with(OpCode::BuildList, Operand::Int(e.elements.len() as i64));
            }
            Expr::Map(e) => {
                for (key, value) in e.keys.iter().zip(e.values.iter()) {
                    self.emit_expr(key);
                    self.emit_expr(value);
                }
                self.emit_with(OpCode::BuildMap, Operand::Int(e.keys.len() as i64));
            }
            Expr::Index(e) => {
                self.emit_expr(e.object);
                self.emit_expr(e.index);
                self.emit(OpCode::LoadIndex);
            }
        }
    }

    fn emit_variable(&mut self, name: &str) {
        if name == "z" {
            self.emit_with(OpCode::PushConst, Operand::Str(SYSTEM_RECEIVER.to_string()));
            return;
        }
        if let Some(index) = self.globals.iter().position(|g| g == name) {
            self.emit_with(OpCode::LoadVar, Operand::Int(index as i64));
        } else if let Some(&id) = self.class_map.get(name) {
            self.emit_with(OpCode::PushConst, Operand::Int(id as i64));
        } else {
            self.emit_with(OpCode::LoadVar, Operand::Str(name.to_string()));
        }
    }

    // === class compilation ===

    fn compile_class(&mut self, class: &ClassStmt<'_>) -> CompiledClass {
        let id = self.class_map[class.name.lexeme];
        let mut compiled = CompiledClass {
            name: class.name.lexeme.to_string(),
            superclass: class.superclass.map(|t| t.lexeme.to_string()),
            id,
            methods: HashMap::new(),
            static_methods: HashMap::new(),
            static_init: Vec::new(),
        };

        for method in class.methods {
            let info = CompiledMethod {
                bytecode: self.compile_method(method),
                param_names: method
                    .params
                    .iter()
                    .map(|p| p.name.lexeme.to_string())
                    .collect(),
            };
            if method.is_static {
                compiled.static_methods.insert(method.name.lexeme.to_string(), info);
            } else {
                compiled.methods.insert(method.name.lexeme.to_string(), info);
            }
        }

        let saved = mem::take(&mut self.bytecode);
        for field in class.fields {
            if !field.is_static {
                continue;
            }
            if let Some(initializer) = field.initializer {
                self.emit_with(OpCode::PushConst, Operand::Int(id as i64));
                self.emit_expr(initializer);
                self.emit_with(OpCode::SetStatic, Operand::Str(field.name.lexeme.to_string()));
                self.emit(OpCode::Pop);
            }
        }
        compiled.static_init = mem::replace(&mut self.bytecode, saved);

        compiled
    }

    fn compile_method(&mut self, method: &FunctionStmt<'_>) -> Vec<Instruction> {
        let saved = mem::take(&mut self.bytecode);
        for stmt in method.body {
            self.emit_stmt(stmt);
        }
        if self.bytecode.last().map(|i| i.op) != Some(OpCode::Ret) {
            self.emit_with(OpCode::PushConst, Operand::Null);
            self.emit(OpCode::Ret);
        }
        mem::replace(&mut self.bytecode, saved)
    }
}
