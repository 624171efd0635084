pub mod bytecode;
pub mod error;
pub mod stack;
pub mod value;

use std::collections::HashMap;
use std::io::{self, Write};

use bytecode::{Instruction, OpCode, Operand, Program, SYSTEM_RECEIVER};
use error::{RuntimeError, RuntimeResult};
use stack::Stack;
use value::Value;

/// An active try/handle region: where to jump and how deep the operand stack
/// was when the region was entered.
#[derive(Debug, Clone, Copy)]
struct Handler {
    target: usize,
    depth: usize,
}

/// One invocation record. The instruction slice is borrowed straight from
/// the program; locals hold `this` and the method parameters.
struct CallFrame<'run> {
    code: &'run [Instruction],
    ip: usize,
    locals: HashMap<String, Value>,
    handlers: Vec<Handler>,
}

impl<'run> CallFrame<'run> {
    fn new(code: &'run [Instruction]) -> Self {
        Self {
            code,
            ip: 0,
            locals: HashMap::new(),
            handlers: Vec::new(),
        }
    }
}

/// The stack interpreter. Runs the static-initializer stream to completion
/// first, then the main stream. Program output goes through an injectable
/// sink so embedders and tests can capture it.
pub struct AlphabetVM<'run> {
    program: &'run Program,
    stack: Stack,
    frames: Vec<CallFrame<'run>>,
    globals: HashMap<String, Value>,
    statics: HashMap<u16, HashMap<String, Value>>,
    out: Box<dyn Write + 'run>,
}

impl<'run> AlphabetVM<'run> {
    pub fn new(program: &'run Program) -> Self {
        Self::with_output(program, Box::new(io::stdout()))
    }

    pub fn with_output(program: &'run Program, out: Box<dyn Write + 'run>) -> Self {
        Self {
            program,
            stack: Stack::new(),
            frames: Vec::new(),
            globals: HashMap::new(),
            statics: HashMap::new(),
            out,
        }
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    pub fn static_field(&self, class_id: u16, name: &str) -> Option<&Value> {
        self.statics.get(&class_id).and_then(|fields| fields.get(name))
    }

    pub fn run(&mut self) -> RuntimeResult<()> {
        let program = self.program;
        tracing::debug!(
            main = program.main.len(),
            static_init = program.static_init.len(),
            classes = program.classes.len(),
            "starting vm"
        );
        if !program.static_init.is_empty() {
            self.frames.push(CallFrame::new(&program.static_init));
            self.run_loop()?;
        }
        if !program.main.is_empty() {
            self.frames.push(CallFrame::new(&program.main));
            self.run_loop()?;
        }
        Ok(())
    }

    fn run_loop(&mut self) -> RuntimeResult<()> {
        while !self.frames.is_empty() {
            let instruction = {
                let Some(frame) = self.frames.last_mut() else {
                    break;
                };
                if frame.ip >= frame.code.len() {
                    self.frames.pop();
                    continue;
                }
                let instruction = frame.code[frame.ip].clone();
                frame.ip += 1;
                instruction
            };
            if let Err(err) = self.execute(&instruction) {
                match err {
                    RuntimeError::UnhandledException(_) => return Err(err),
                    // every other runtime failure unwinds like a thrown value
                    other => self.throw_value(Value::Str(other.to_string()))?,
                }
            }
        }
        Ok(())
    }

    fn execute(&mut self, instruction: &Instruction) -> RuntimeResult<()> {
        match instruction.op {
            OpCode::PushConst => {
                let value = match &instruction.operand {
                    Operand::Float(n) => Value::Number(*n),
                    Operand::Int(i) => Value::Number(*i as f64),
                    Operand::Str(s) => Value::Str(s.clone()),
                    Operand::Null | Operand::None | Operand::Call(..) => Value::Null,
                };
                self.stack.push(value)?;
            }

            OpCode::LoadVar => {
                let value = match &instruction.operand {
                    Operand::Int(index) => match self.program.globals.get(*index as usize) {
                        Some(name) => self.lookup(name),
                        None => Value::Null,
                    },
                    Operand::Str(name) => self.lookup(name),
                    _ => Value::Null,
                };
                self.stack.push(value)?;
            }

            // non-popping: the stored value stays on the stack
            OpCode::StoreVar => {
                let value = self.stack.last()?.clone();
                match &instruction.operand {
                    Operand::Int(index) => {
                        if let Some(name) = self.program.globals.get(*index as usize) {
                            self.globals.insert(name.clone(), value);
                        }
                    }
                    Operand::Str(name) => {
                        self.globals.insert(name.clone(), value);
                    }
                    _ => {}
                }
            }

            OpCode::Pop => {
                self.stack.pop()?;
            }

            OpCode::Add => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                let result = match (&a, &b) {
                    (Value::Number(x), Value::Number(y)) => Value::Number(x + y),
                    (Value::Str(x), Value::Str(y)) => Value::Str(format!("{x}{y}")),
                    _ => Value::Null,
                };
                self.stack.push(result)?;
            }

            OpCode::Sub => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                let result = match (&a, &b) {
                    (Value::Number(x), Value::Number(y)) => Value::Number(x - y),
                    _ => Value::Null,
                };
                self.stack.push(result)?;
            }

            OpCode::Mul => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                let result = match (&a, &b) {
                    (Value::Number(x), Value::Number(y)) => Value::Number(x * y),
                    _ => Value::Null,
                };
                self.stack.push(result)?;
            }

            OpCode::Div => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                let result = match (&a, &b) {
                    (Value::Number(x), Value::Number(y)) => {
                        if *y == 0.0 {
                            return Err(RuntimeError::DivisionByZero);
                        }
                        Value::Number(x / y)
                    }
                    _ => Value::Null,
                };
                self.stack.push(result)?;
            }

            // fmod semantics: a zero divisor yields NaN, it does not throw
            OpCode::Percent => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                let result = match (&a, &b) {
                    (Value::Number(x), Value::Number(y)) => Value::Number(x % y),
                    _ => Value::Null,
                };
                self.stack.push(result)?;
            }

            OpCode::Eq => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                self.stack
                    .push(Value::Number(if a == b { 1.0 } else { 0.0 }))?;
            }

            OpCode::Gt => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                let result = match (&a, &b) {
                    (Value::Number(x), Value::Number(y)) => {
                        Value::Number(if x > y { 1.0 } else { 0.0 })
                    }
                    _ => Value::Null,
                };
                self.stack.push(result)?;
            }

            OpCode::Lt => {
                let b = self.stack.pop()?;
                let a = self.stack.pop()?;
                let result = match (&a, &b) {
                    (Value::Number(x), Value::Number(y)) => {
                        Value::Number(if x < y { 1.0 } else { 0.0 })
                    }
                    _ => Value::Null,
                };
                self.stack.push(result)?;
            }

            OpCode::Not => {
                let a = self.stack.pop()?;
                self.stack
                    .push(Value::Number(if a.is_falsey() { 1.0 } else { 0.0 }))?;
            }

            OpCode::Jump => {
                if let Operand::Int(target) = instruction.operand {
                    if let Some(frame) = self.frames.last_mut() {
                        frame.ip = target as usize;
                    }
                }
            }

            OpCode::JumpIfFalse => {
                let condition = self.stack.pop()?;
                if condition.is_falsey() {
                    if let Operand::Int(target) = instruction.operand {
                        if let Some(frame) = self.frames.last_mut() {
                            frame.ip = target as usize;
                        }
                    }
                }
            }

            OpCode::Ret => {
                let value = self.stack.pop()?;
                self.frames.pop();
                if !self.frames.is_empty() {
                    self.stack.push(value)?;
                }
            }

            OpCode::Call => {
                if let Operand::Call(method_name, argc) = &instruction.operand {
                    self.call(method_name, *argc)?;
                }
            }

            OpCode::New => {
                let program = self.program;
                let value = match &instruction.operand {
                    Operand::Str(name) => {
                        let class = program
                            .classes
                            .values()
                            .find(|c| &c.name == name)
                            .ok_or_else(|| RuntimeError::UnknownClass(name.clone()))?;
                        Value::object(class.id)
                    }
                    Operand::Int(id) => {
                        let id = *id as u16;
                        if !program.classes.contains_key(&id) {
                            return Err(RuntimeError::UnknownClassId(id));
                        }
                        Value::object(id)
                    }
                    _ => Value::Null,
                };
                self.stack.push(value)?;
            }

            OpCode::Print => {
                let value = self.stack.pop()?;
                let _receiver = self.stack.pop()?;
                let _ = writeln!(self.out, "{}", value);
                self.stack.push(Value::Null)?;
            }

            OpCode::Halt => {
                self.frames.clear();
            }

            OpCode::SetupTry => {
                if let Operand::Int(target) = instruction.operand {
                    let depth = self.stack.depth();
                    if let Some(frame) = self.frames.last_mut() {
                        frame.handlers.push(Handler {
                            target: target as usize,
                            depth,
                        });
                    }
                }
            }

            OpCode::PopTry => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.handlers.pop();
                }
            }

            OpCode::Throw => {
                let value = self.stack.pop()?;
                self.throw_value(value)?;
            }

            OpCode::GetStatic => {
                if let Operand::Str(name) = &instruction.operand {
                    let receiver = self.stack.pop()?;
                    let value = match receiver.as_number() {
                        Some(id) => self
                            .statics
                            .get(&(id as u16))
                            .and_then(|fields| fields.get(name))
                            .cloned()
                            .unwrap_or(Value::Null),
                        None => Value::Null,
                    };
                    self.stack.push(value)?;
                }
            }

            // stores and pushes the value back, mirroring StoreVar's
            // value-remains contract
            OpCode::SetStatic => {
                if let Operand::Str(name) = &instruction.operand {
                    let value = self.stack.pop()?;
                    let receiver = self.stack.pop()?;
                    if let Some(id) = receiver.as_number() {
                        self.statics
                            .entry(id as u16)
                            .or_default()
                            .insert(name.clone(), value.clone());
                    }
                    self.stack.push(value)?;
                }
            }

            OpCode::LoadField => {
                if let Operand::Str(name) = &instruction.operand {
                    let object = self.stack.pop()?;
                    let value = match &object {
                        Value::Object(object) => object
                            .borrow()
                            .fields
                            .get(name)
                            .cloned()
                            .unwrap_or(Value::Null),
                        _ => Value::Null,
                    };
                    self.stack.push(value)?;
                }
            }

            OpCode::StoreField => {
                if let Operand::Str(name) = &instruction.operand {
                    let value = self.stack.pop()?;
                    let object = self.stack.pop()?;
                    if let Value::Object(object) = &object {
                        object.borrow_mut().fields.insert(name.clone(), value.clone());
                    }
                    self.stack.push(value)?;
                }
            }

            OpCode::BuildList => {
                if let Operand::Int(count) = instruction.operand {
                    let mut items = Vec::with_capacity(count as usize);
                    for _ in 0..count {
                        items.push(self.stack.pop()?);
                    }
                    items.reverse();
                    self.stack.push(Value::list(items))?;
                }
            }

            // map keys must be strings; anything else is dropped
            OpCode::BuildMap => {
                if let Operand::Int(count) = instruction.operand {
                    let mut entries = std::collections::BTreeMap::new();
                    for _ in 0..count {
                        let value = self.stack.pop()?;
                        let key = self.stack.pop()?;
                        if let Value::Str(key) = key {
                            entries.insert(key, value);
                        }
                    }
                    self.stack.push(Value::map(entries))?;
                }
            }

            OpCode::LoadIndex => {
                let index = self.stack.pop()?;
                let object = self.stack.pop()?;
                let value = match (&object, &index) {
                    (Value::List(list), Value::Number(n)) if *n >= 0.0 => list
                        .borrow()
                        .get(*n as usize)
                        .cloned()
                        .unwrap_or(Value::Null),
                    (Value::Map(map), Value::Str(key)) => {
                        map.borrow().get(key).cloned().unwrap_or(Value::Null)
                    }
                    _ => Value::Null,
                };
                self.stack.push(value)?;
            }

            OpCode::StoreIndex => {
                let value = self.stack.pop()?;
                let index = self.stack.pop()?;
                let object = self.stack.pop()?;
                if let (Value::List(list), Value::Number(n)) = (&object, &index) {
                    if *n >= 0.0 && (*n as usize) < list.borrow().len() {
                        list.borrow_mut()[*n as usize] = value.clone();
                        self.stack.push(value)?;
                    }
                }
            }

            // parser-level only; the compiler never emits these
            OpCode::Ne | OpCode::Ge | OpCode::Le | OpCode::And | OpCode::Or => {}
        }
        Ok(())
    }

    /// Locals of the current frame shadow globals; unknown names read null.
    fn lookup(&self, name: &str) -> Value {
        if let Some(frame) = self.frames.last() {
            if let Some(value) = frame.locals.get(name) {
                return value.clone();
            }
        }
        self.globals.get(name).cloned().unwrap_or(Value::Null)
    }

    fn call(&mut self, method_name: &str, argc: usize) -> RuntimeResult<()> {
        let program = self.program;

        let mut args = Vec::with_capacity(argc);
        for _ in 0..argc {
            args.push(self.stack.pop()?);
        }
        args.reverse();
        let callee = self.stack.pop()?;

        match callee {
            Value::Str(ref s) if s == SYSTEM_RECEIVER => {
                for arg in args {
                    self.stack.push(arg)?;
                }
                self.system_call(method_name, argc)?;
            }
            Value::Object(ref object) => {
                let class_id = object.borrow().class_id;
                let class = program
                    .classes
                    .get(&class_id)
                    .ok_or(RuntimeError::UnknownClassId(class_id))?;
                // single-level lookup: the superclass chain is not walked
                let method =
                    class
                        .methods
                        .get(method_name)
                        .ok_or_else(|| RuntimeError::MethodNotFound {
                            class: class.name.clone(),
                            method: method_name.to_string(),
                        })?;

                let mut frame = CallFrame::new(&method.bytecode);
                frame.locals.insert("this".to_string(), callee.clone());
                for (param, arg) in method.param_names.iter().zip(args.into_iter()) {
                    frame.locals.insert(param.clone(), arg);
                }
                self.frames.push(frame);
            }
            _ => self.stack.push(Value::Null)?,
        }
        Ok(())
    }

    /// The built-in vtable behind the system receiver.
    fn system_call(&mut self, method: &str, argc: usize) -> RuntimeResult<()> {
        match method {
            "o" if argc >= 1 => {
                let value = self.stack.pop()?;
                let _ = writeln!(self.out, "{}", value);
                self.stack.push(Value::Null)?;
            }
            "i" => {
                let mut input = String::new();
                let _ = io::stdin().read_line(&mut input);
                let input = input.trim_end_matches(['\r', '\n']);
                match input.parse::<f64>() {
                    Ok(number) => self.stack.push(Value::Number(number))?,
                    Err(_) => self.stack.push(Value::Str(input.to_string()))?,
                }
            }
            "t" => {
                self.throw_value(Value::Str("Custom Error 15".to_string()))?;
            }
            "f" if argc >= 1 => {
                let path = self.stack.pop()?;
                if let Value::Str(path) = path {
                    let contents = std::fs::read_to_string(&path).unwrap_or_default();
                    self.stack.push(Value::Str(contents))?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Explicit unwind loop. At each frame the innermost active handler wins:
    /// the operand stack is truncated to the recorded depth, the thrown value
    /// is pushed and the frame's PC jumps to the handler. Frames without a
    /// handler are popped; running out of frames ends the run.
    fn throw_value(&mut self, value: Value) -> RuntimeResult<()> {
        while let Some(frame) = self.frames.last_mut() {
            if let Some(handler) = frame.handlers.pop() {
                frame.ip = handler.target;
                self.stack.truncate(handler.depth);
                self.stack.push(value)?;
                return Ok(());
            }
            self.frames.pop();
        }
        self.stack.clear();
        Err(RuntimeError::UnhandledException(value.to_string()))
    }
}
