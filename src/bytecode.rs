//! Bytecode instruction set and code-unit format
//!
//! This module defines the contract between the external compiler and the
//! virtual machine: a stack-machine instruction list per code unit, the
//! unit's symbol metadata (parameters, var-declared names, lexical
//! declarations, nested function declarations), and the exception-handler
//! table driving fault recovery. An [`Assembler`] with label patching
//! builds units; the compiler collaborator and the test suite both use it.

use std::rc::Rc;

use crate::value::{CheapClone, JsString, JsValue};

/// A literal operand.
#[derive(Debug, Clone)]
pub enum Literal {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
}

impl Literal {
    pub fn to_value(&self) -> JsValue {
        match self {
            Literal::Undefined => JsValue::Undefined,
            Literal::Null => JsValue::Null,
            Literal::Boolean(b) => JsValue::Boolean(*b),
            Literal::Number(n) => JsValue::Number(*n),
            Literal::String(s) => JsValue::String(s.cheap_clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `+x`
    Pos,
    /// `!x`
    Not,
    /// `~x`
    BitNot,
    /// `typeof x`; an unresolvable reference operand yields "undefined"
    Typeof,
    /// `void x`
    Void,
    /// `delete x`; operates on the reference, not the value
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    In,
    Instanceof,
}

/// Bytecode instruction
///
/// The machine operates on a stack of values, references, and saved
/// completions. Instructions that take a reference operand say so; the
/// compiler is responsible for emitting `GetValue` where a plain value is
/// needed.
#[derive(Debug, Clone)]
pub enum Instruction {
    // ═══════════════════════════════════════════════════════════════════
    // Values & references
    // ═══════════════════════════════════════════════════════════════════
    /// Push a literal value
    Literal { value: Literal },

    /// Push the `this` value resolved through the scope chain
    This,

    /// Push a reference produced by identifier resolution
    Resolve { name: JsString },

    /// Pop a reference, push the value it addresses
    GetValue,

    /// Pop a value, pop a reference, write through it, push the value back
    PutValue,

    /// Pop a base value, push a property reference `base.name`
    Property { name: JsString },

    /// Pop a key value, pop a base value, push a property reference
    Element,

    /// Push a super reference `super.name` for the active method
    SuperMember { name: JsString },

    /// Pop a key value, push a super reference `super[key]`
    SuperElement,

    /// Fail with a reference error unless a super binding is in scope
    SuperGuard,

    // ═══════════════════════════════════════════════════════════════════
    // Stack shuffling
    // ═══════════════════════════════════════════════════════════════════
    /// Duplicate the top entry
    Dup,

    /// Discard the top entry
    Pop,

    /// Discard the top `count` entries
    PopN { count: u16 },

    /// Take the top entry and bury it `count` slots down
    Rotate { count: u16 },

    // ═══════════════════════════════════════════════════════════════════
    // Control flow
    // ═══════════════════════════════════════════════════════════════════
    /// Unconditional jump
    Jump { target: u32 },

    /// Pop a value; jump when it is truthy
    JumpTrue { target: u32 },

    /// Pop a value; jump when it is falsy
    JumpFalse { target: u32 },

    /// Pop a case value, peek the discriminant; on strict equality pop the
    /// discriminant too and jump
    Case { target: u32 },

    /// Pop the discriminant and jump (switch fallthrough to default)
    Default { target: u32 },

    // ═══════════════════════════════════════════════════════════════════
    // Operators
    // ═══════════════════════════════════════════════════════════════════
    /// Pop the operand (a reference for typeof/delete), push the result
    Unary { op: UnaryOp },

    /// Pop right, pop left, push the result
    Binary { op: BinaryOp },

    // ═══════════════════════════════════════════════════════════════════
    // Object, array, and function literals
    // ═══════════════════════════════════════════════════════════════════
    /// Push a fresh ordinary object
    Object,

    /// Pop a value, define it as a data member on the object below
    DefineMember { name: JsString },

    /// Instantiate `code` as a method of the object on top (home object set)
    DefineMethod { name: JsString, code: Rc<CodeUnit> },

    /// Instantiate `code` as a getter on the object on top
    DefineGetter { name: JsString, code: Rc<CodeUnit> },

    /// Instantiate `code` as a setter on the object on top
    DefineSetter { name: JsString, code: Rc<CodeUnit> },

    /// Push a fresh array and an element counter of 0
    Array,

    /// Elided element: bump the counter. Otherwise pop a value, define it
    /// at the counter index, bump the counter
    Index { empty: bool },

    /// Pop the counter, store it as the array's final `length`
    ArrayDone,

    /// Instantiate a closure over the current lexical environment
    Function { code: Rc<CodeUnit> },

    /// Push a fresh regexp object carrying a literal's pattern and flags
    RegExp { pattern: JsString, flags: JsString },

    // ═══════════════════════════════════════════════════════════════════
    // Calls
    // ═══════════════════════════════════════════════════════════════════
    /// Pop `argc` arguments then the callee entry. A reference callee
    /// supplies the `this` value (property base or with-scope object)
    Call { argc: u16 },

    /// Pop `argc` arguments then the constructor value
    Construct { argc: u16 },

    // ═══════════════════════════════════════════════════════════════════
    // Bindings & scopes
    // ═══════════════════════════════════════════════════════════════════
    /// Pop a value, write it to the var-scope binding `name`
    Var { name: JsString },

    /// Pop a value, initialize the lexical binding `name`
    Let { name: JsString },

    /// Pop a value, initialize the constant lexical binding `name`
    Const { name: JsString },

    /// Enter a block scope, hoisting its lexical declarations uninitialized
    Block { lexicals: Vec<LexicalDecl> },

    /// Leave the innermost lexical scope
    BlockExit,

    /// Pop a value, coerce to object, enter a `with` scope over it
    With,

    // ═══════════════════════════════════════════════════════════════════
    // Completions
    // ═══════════════════════════════════════════════════════════════════
    /// Pop a value and raise it as a thrown completion
    Throw,

    /// Pop a value and return it from the running code unit
    Return,

    /// Pop a value into the statement-completion slot
    PopEval,

    /// Push a normal-completion marker before falling into a finally body
    PushNormal,

    /// Pop a completion marker; re-raise it when abrupt
    EndFinally,

    /// Do nothing
    Nop,
}

/// Fault recovery kind of a handler range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Pop one lexical-environment level and keep scanning outward
    ScopeExit,
    /// Rewind the stack, push the thrown value, resume at `target`
    Catch,
    /// Rewind the stack, push the abrupt completion marker, resume at `target`
    Finally,
}

/// One `[begin, end)` instruction range with its recovery behavior.
#[derive(Debug, Clone)]
pub struct ExceptionHandler {
    pub begin: u32,
    pub end: u32,
    pub target: u32,
    pub kind: HandlerKind,
    /// Operand-stack depth to rewind to before resuming
    pub depth: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    Global,
    Eval,
    Function,
}

/// A hoisted lexical declaration (`let`/`const`).
#[derive(Debug, Clone)]
pub struct LexicalDecl {
    pub name: JsString,
    pub constant: bool,
}

/// A hoisted nested function declaration.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: JsString,
    pub code: Rc<CodeUnit>,
}

/// One compiled unit of code: a function body, eval text, or a whole
/// program. Nested units are embedded in `Function`/method instructions.
#[derive(Debug)]
pub struct CodeUnit {
    pub name: Option<JsString>,
    pub kind: CodeKind,
    pub arrow: bool,
    pub strict: bool,
    pub params: Rc<[JsString]>,
    pub var_declared: Vec<JsString>,
    pub lexicals: Vec<LexicalDecl>,
    pub functions: Vec<FunctionDecl>,
    pub instructions: Vec<Instruction>,
    pub handlers: Vec<ExceptionHandler>,
}

/// An unresolved jump target handed out by the assembler.
#[derive(Debug, Clone, Copy)]
pub struct Label(usize);

struct HandlerSpec {
    begin: Label,
    end: Label,
    target: Label,
    kind: HandlerKind,
    depth: u32,
}

/// Builds a [`CodeUnit`], patching forward jumps once their labels bind.
pub struct Assembler {
    name: Option<JsString>,
    kind: CodeKind,
    arrow: bool,
    strict: bool,
    params: Vec<JsString>,
    var_declared: Vec<JsString>,
    lexicals: Vec<LexicalDecl>,
    functions: Vec<FunctionDecl>,
    instructions: Vec<Instruction>,
    labels: Vec<Option<u32>>,
    patches: Vec<(usize, Label)>,
    handler_specs: Vec<HandlerSpec>,
}

impl Assembler {
    pub fn new(kind: CodeKind) -> Self {
        Assembler {
            name: None,
            kind,
            arrow: false,
            strict: false,
            params: Vec::new(),
            var_declared: Vec::new(),
            lexicals: Vec::new(),
            functions: Vec::new(),
            instructions: Vec::new(),
            labels: Vec::new(),
            patches: Vec::new(),
            handler_specs: Vec::new(),
        }
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = Some(JsString::from(name));
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    pub fn set_arrow(&mut self, arrow: bool) {
        self.arrow = arrow;
    }

    pub fn add_param(&mut self, name: &str) {
        self.params.push(JsString::from(name));
    }

    pub fn declare_var(&mut self, name: &str) {
        self.var_declared.push(JsString::from(name));
    }

    pub fn declare_lexical(&mut self, name: &str, constant: bool) {
        self.lexicals.push(LexicalDecl {
            name: JsString::from(name),
            constant,
        });
    }

    pub fn declare_function(&mut self, name: &str, code: Rc<CodeUnit>) {
        self.functions.push(FunctionDecl {
            name: JsString::from(name),
            code,
        });
    }

    /// Next instruction position.
    pub fn position(&self) -> u32 {
        self.instructions.len() as u32
    }

    pub fn emit(&mut self, instruction: Instruction) -> u32 {
        let position = self.position();
        self.instructions.push(instruction);
        position
    }

    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Bind a label to the current position.
    pub fn bind(&mut self, label: Label) {
        self.labels[label.0] = Some(self.position());
    }

    pub fn emit_jump(&mut self, label: Label) {
        self.emit_patched(Instruction::Jump { target: u32::MAX }, label);
    }

    pub fn emit_jump_true(&mut self, label: Label) {
        self.emit_patched(Instruction::JumpTrue { target: u32::MAX }, label);
    }

    pub fn emit_jump_false(&mut self, label: Label) {
        self.emit_patched(Instruction::JumpFalse { target: u32::MAX }, label);
    }

    pub fn emit_case(&mut self, label: Label) {
        self.emit_patched(Instruction::Case { target: u32::MAX }, label);
    }

    pub fn emit_default(&mut self, label: Label) {
        self.emit_patched(Instruction::Default { target: u32::MAX }, label);
    }

    fn emit_patched(&mut self, instruction: Instruction, label: Label) {
        let index = self.instructions.len();
        self.instructions.push(instruction);
        self.patches.push((index, label));
    }

    pub fn add_handler(
        &mut self,
        begin: Label,
        end: Label,
        target: Label,
        kind: HandlerKind,
        depth: u32,
    ) {
        self.handler_specs.push(HandlerSpec {
            begin,
            end,
            target,
            kind,
            depth,
        });
    }

    pub fn finish(self) -> CodeUnit {
        let Assembler {
            name,
            kind,
            arrow,
            strict,
            params,
            var_declared,
            lexicals,
            functions,
            mut instructions,
            labels,
            patches,
            handler_specs,
        } = self;

        // Unbound labels resolve past the end, halting the machine.
        let end = instructions.len() as u32;
        let resolve = |label: Label| labels[label.0].unwrap_or(end);

        for (index, label) in patches {
            let target = resolve(label);
            match &mut instructions[index] {
                Instruction::Jump { target: t }
                | Instruction::JumpTrue { target: t }
                | Instruction::JumpFalse { target: t }
                | Instruction::Case { target: t }
                | Instruction::Default { target: t } => *t = target,
                _ => {}
            }
        }

        let handlers = handler_specs
            .into_iter()
            .map(|spec| ExceptionHandler {
                begin: resolve(spec.begin),
                end: resolve(spec.end),
                target: resolve(spec.target),
                kind: spec.kind,
                depth: spec.depth,
            })
            .collect();

        CodeUnit {
            name,
            kind,
            arrow,
            strict,
            params: params.into(),
            var_declared,
            lexicals,
            functions,
            instructions,
            handlers,
        }
    }
}
