use std::{borrow::Cow, cmp::Ordering};

use crate::{
    builtin::{self, OperatorSet},
    error::{PostScriptError, PostScriptResult, StopSignal},
    filter::{FileStream, FilterKind},
    font::{self, FontHost},
    graphics::GraphicsContext,
    lex::{parse_number, Number},
    object::{
        Access, ArrayIndex, DictKey, DictionaryIndex, FileIndex, Name, Object, ObjectKind,
        OperatorIndex, PostScriptArray, PostScriptDictionary, PostScriptString, StringIndex, Vm,
    },
    operator::Operator,
    scanner::{DocumentMetadata, Scanner},
};

/// The outcome of a single fetch-and-execute step, for hosts driving the
/// interpreter with an external pump
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Running,
    Finished,
    Error { kind: &'static str, message: String },
}

/// Configurable implementation limits
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Fetch-and-execute steps before the run is aborted with limitcheck
    pub max_steps: u64,

    /// Concurrently active looping contexts
    pub max_loop_depth: usize,

    /// Largest capacity the `dict` operator will grant
    pub max_dict_capacity: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_steps: 100_000,
            max_loop_depth: 1024,
            max_dict_capacity: 1024,
        }
    }
}

/// A frame of the execution stack: either the open scanner over a program
/// source, or an activation of a procedure body
///
/// An activation shares the procedure's element storage and owns only its
/// cursor, so recursive and mutually recursive procedures need no copies
#[derive(Debug)]
enum ExecFrame<'a> {
    Scanner(Scanner<'a>),
    Procedure { array: ArrayIndex, cursor: usize },
}

#[derive(Debug)]
enum LoopKind {
    Repeat {
        remaining: i32,
    },
    For {
        control: f64,
        step: f64,
        limit: f64,
        integer: bool,
    },
    Infinite,
    ArrayForAll {
        array: ArrayIndex,
        index: usize,
    },
    StringForAll {
        string: StringIndex,
        index: usize,
    },
    DictForAll {
        dict: DictionaryIndex,
        keys: Vec<DictKey>,
        index: usize,
    },
}

/// An active looping context. `depth` records the execution-stack height at
/// creation; the loop is ready to advance once the stack has drained back to
/// it, and `exit` truncates the stack to it
#[derive(Debug)]
struct LoopContext {
    kind: LoopKind,
    body: ArrayIndex,
    depth: usize,
}

pub struct Interpreter<'a> {
    vm: Vm,

    operand_stack: Vec<Object>,
    dictionary_stack: Vec<DictionaryIndex>,
    execution_stack: Vec<ExecFrame<'a>>,
    loop_stack: Vec<LoopContext>,

    metadata: DocumentMetadata,
    limits: Limits,
    steps_remaining: u64,

    /// Cooperative cancellation flag, observed between steps. Set by the
    /// host or by the `quit` operator
    done: bool,

    system_dict: DictionaryIndex,
    user_dict: DictionaryIndex,
    font_directory: DictionaryIndex,

    /// The file object returned by `currentfile`
    source_file: FileIndex,

    font_registry: Option<Box<dyn FontHost>>,

    /// 31-bit linear congruential generator state backing rand/srand/rrand.
    /// Keeping the whole state in 31 bits lets rrand report a value that
    /// srand restores exactly
    rng_state: u32,

    save_counter: u32,
}

impl<'a> Interpreter<'a> {
    /// Parses the DSC metadata, builds the stacks, and registers the
    /// built-in operators. No program text is executed yet
    pub fn load(source: &'a [u8]) -> PostScriptResult<Self> {
        Self::with_font_registry(source, None)
    }

    pub fn with_font_registry(
        source: &'a [u8],
        font_registry: Option<Box<dyn FontHost>>,
    ) -> PostScriptResult<Self> {
        let metadata = DocumentMetadata::from_source(source);
        let limits = Limits::default();

        let mut vm = Vm::new();

        let system_dict = vm.new_dict(builtin::gen_system_dict()?);
        let user_dict = vm.new_dict(PostScriptDictionary::with_capacity(
            limits.max_dict_capacity,
        ));
        let error_dict = vm.new_dict(PostScriptDictionary::with_capacity(32));
        let font_directory = vm.new_dict(PostScriptDictionary::with_capacity(64));

        let standard_encoding = font::standard_encoding_array(&mut vm);

        {
            let entries = [
                (&b"systemdict"[..], ObjectKind::Dictionary(system_dict)),
                (b"userdict", ObjectKind::Dictionary(user_dict)),
                (b"errordict", ObjectKind::Dictionary(error_dict)),
                (b"FontDirectory", ObjectKind::Dictionary(font_directory)),
                (b"StandardEncoding", ObjectKind::Array(standard_encoding)),
            ];

            let dict = vm.get_dict_mut(system_dict);

            for (key, kind) in entries {
                dict.insert(DictKey::name(key), Object::literal(kind))?;
            }

            dict.set_access(Access::ExecuteOnly);
        }

        let source_file = vm.new_file(FileStream::Source);

        Ok(Self {
            vm,
            operand_stack: Vec::new(),
            dictionary_stack: vec![system_dict, user_dict],
            execution_stack: vec![ExecFrame::Scanner(Scanner::new(Cow::Borrowed(source)))],
            loop_stack: Vec::new(),
            steps_remaining: limits.max_steps,
            metadata,
            limits,
            done: false,
            system_dict,
            user_dict,
            font_directory,
            source_file,
            font_registry,
            rng_state: 0x2e7a_9d3b & 0x7fff_ffff,
            save_counter: 0,
        })
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.steps_remaining = limits.max_steps;
        self.limits = limits;
        self
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    /// Inspection hook for embedders and tests
    pub fn operand_stack(&self) -> &[Object] {
        &self.operand_stack
    }

    pub fn dictionary_stack(&self) -> &[DictionaryIndex] {
        &self.dictionary_stack
    }

    pub fn vm(&self) -> &Vm {
        &self.vm
    }

    /// Requests cooperative cancellation; takes effect before the next step
    pub fn request_stop(&mut self) {
        self.done = true;
    }

    /// Drives the interpreter until the program completes or an error
    /// propagates out
    pub fn run(&mut self, gtx: &mut dyn GraphicsContext) -> PostScriptResult<()> {
        loop {
            match self.tick(gtx) {
                Ok(true) => {}
                Ok(false) => return Ok(()),
                // an uncaught `stop` terminates the program quietly
                Err(err) if err.is::<StopSignal>() => {
                    self.done = true;
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Executes one fetch-and-execute step so a host can interleave
    /// rendering with other work
    pub fn step(&mut self, gtx: &mut dyn GraphicsContext) -> Step {
        match self.tick(gtx) {
            Ok(true) => Step::Running,
            Ok(false) => Step::Finished,
            Err(err) if err.is::<StopSignal>() => {
                self.done = true;
                Step::Finished
            }
            Err(err) => {
                let kind = err
                    .downcast_ref::<PostScriptError>()
                    .map_or("internalerror", PostScriptError::name);

                Step::Error {
                    kind,
                    message: err.to_string(),
                }
            }
        }
    }

    /// One iteration of the top-level loop: drive a ready looping context
    /// if there is one, otherwise fetch and dispatch the next object.
    /// Returns false when the program has terminated
    fn tick(&mut self, gtx: &mut dyn GraphicsContext) -> PostScriptResult<bool> {
        if self.done {
            return Ok(false);
        }

        if let Some(ctx) = self.loop_stack.last() {
            if self.execution_stack.len() <= ctx.depth {
                self.drive_loop()?;
                self.charge_step()?;
                return Ok(true);
            }
        }

        match self.fetch()? {
            Some(obj) => {
                self.dispatch(obj, gtx)?;
                self.charge_step()?;
                Ok(true)
            }
            None => Ok(!self.loop_stack.is_empty()),
        }
    }

    fn charge_step(&mut self) -> PostScriptResult<()> {
        if self.steps_remaining == 0 {
            anyhow::bail!(PostScriptError::LimitCheck);
        }

        self.steps_remaining -= 1;

        Ok(())
    }

    /// The next object to execute: the element under the cursor of the
    /// topmost procedure activation, or the next scanned value of the
    /// topmost source. Exhausted frames are popped
    fn fetch(&mut self) -> PostScriptResult<Option<Object>> {
        loop {
            let fetched = match self.execution_stack.last_mut() {
                None => return Ok(None),
                Some(ExecFrame::Procedure { array, cursor }) => {
                    let arr = self.vm.arrays.get(array).unwrap();

                    if *cursor < arr.len() {
                        let obj = arr.as_slice()[*cursor].clone();
                        *cursor += 1;
                        Some(obj)
                    } else {
                        None
                    }
                }
                Some(ExecFrame::Scanner(scanner)) => scanner.next_object(&mut self.vm)?,
            };

            match fetched {
                Some(obj) => return Ok(Some(obj)),
                None => {
                    self.execution_stack.pop();
                }
            }
        }
    }

    /// Dispatches a fetched object. Literal objects and executable arrays
    /// push themselves; executable names resolve through the dictionary
    /// stack and the resolved definition is then dispatched
    fn dispatch(&mut self, obj: Object, gtx: &mut dyn GraphicsContext) -> PostScriptResult<()> {
        if !obj.executable {
            self.push(obj);
            return Ok(());
        }

        match obj.kind {
            // procedure bodies are only activated by name lookup or exec,
            // not by being fetched literally
            ObjectKind::Array(..) | ObjectKind::PackedArray(..) => self.push(obj),
            ObjectKind::Operator(idx) => self.invoke(idx, gtx)?,
            ObjectKind::Name(name) => {
                let definition = self.lookup(&name)?;

                match definition {
                    Object {
                        kind: ObjectKind::Operator(idx),
                        ..
                    } => self.invoke(idx, gtx)?,
                    Object {
                        kind: ObjectKind::Array(arr) | ObjectKind::PackedArray(arr),
                        executable: true,
                    } => self.push_activation(arr),
                    definition if !definition.executable => self.push(definition),
                    _ => anyhow::bail!(PostScriptError::TypeCheck),
                }
            }
            _ => self.push(obj),
        }

        Ok(())
    }

    /// Executes an object the way `exec` and `stopped` do: unlike plain
    /// dispatch, an executable array is activated rather than pushed, and an
    /// executable string runs as a program in its own right
    fn execute_object(
        &mut self,
        obj: Object,
        gtx: &mut dyn GraphicsContext,
    ) -> PostScriptResult<()> {
        if !obj.executable {
            self.push(obj);
            return Ok(());
        }

        match obj.kind {
            ObjectKind::Array(arr) | ObjectKind::PackedArray(arr) => {
                self.push_activation(arr);
                Ok(())
            }
            ObjectKind::String(s) => {
                let bytes = self.vm.get_str(s).as_bytes().to_vec();
                self.execution_stack
                    .push(ExecFrame::Scanner(Scanner::new(Cow::Owned(bytes))));
                Ok(())
            }
            ObjectKind::Name(..) | ObjectKind::Operator(..) => self.dispatch(obj, gtx),
            _ => {
                self.push(obj);
                Ok(())
            }
        }
    }

    /// Resolves an executable name through the dictionary stack, innermost
    /// dictionary first
    fn lookup(&self, name: &Name) -> PostScriptResult<Object> {
        let key = DictKey::Name(name.clone());

        for &dict in self.dictionary_stack.iter().rev() {
            if let Some(obj) = self.vm.get_dict(dict).get(&key) {
                return Ok(obj.clone());
            }
        }

        anyhow::bail!(PostScriptError::Undefined { name: name.clone() })
    }

    fn push_activation(&mut self, array: ArrayIndex) {
        self.execution_stack
            .push(ExecFrame::Procedure { array, cursor: 0 });
    }

    /// Invokes a named operator: picks the overload whose signature matches
    /// the operand stack, then runs it transactionally — if the body raises,
    /// the operand stack is restored to its pre-operator state before the
    /// error propagates
    fn invoke(&mut self, idx: OperatorIndex, gtx: &mut dyn GraphicsContext) -> PostScriptResult<()> {
        let set = &builtin::operator_table()[idx.0];
        let op = self.resolve_overload(set)?;

        let saved = self.operand_stack.clone();

        match self.execute_operator(op, gtx) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.operand_stack = saved;
                Err(err)
            }
        }
    }

    /// Signatures are compared right-to-left against the stack top by
    /// type-set intersection; the first registered signature that matches
    /// wins
    fn resolve_overload(&self, set: &OperatorSet) -> PostScriptResult<Operator> {
        let stack = &self.operand_stack;
        let mut arity_fits = false;

        for (signature, op) in &set.defs {
            if signature.len() > stack.len() {
                continue;
            }

            arity_fits = true;

            let matches = signature
                .iter()
                .rev()
                .zip(stack.iter().rev())
                .all(|(type_set, obj)| type_set.intersects(obj.type_set()));

            if matches {
                return Ok(*op);
            }
        }

        if arity_fits {
            anyhow::bail!(PostScriptError::TypeCheck);
        }

        anyhow::bail!(PostScriptError::StackUnderflow);
    }

    fn execute_operator(
        &mut self,
        op: Operator,
        gtx: &mut dyn GraphicsContext,
    ) -> PostScriptResult<()> {
        match op {
            // operand stack
            Operator::Pop => self.pop().map(drop),
            Operator::Exch => self.exch(),
            Operator::Dup => self.dup(),
            Operator::CopyN => self.copy_n(),
            Operator::CopyComposite => self.copy_composite(),
            Operator::Index => self.index(),
            Operator::Roll => self.roll(),
            Operator::Clear => {
                self.operand_stack.clear();
                Ok(())
            }
            Operator::Count => {
                let count = self.operand_stack.len();
                self.push(Object::int(count as i32));
                Ok(())
            }
            Operator::Mark => {
                self.push(Object::literal(ObjectKind::Mark));
                Ok(())
            }
            Operator::ClearToMark => self.clear_to_mark(),
            Operator::CountToMark => self.count_to_mark(),

            // arithmetic
            Operator::Add => self.arith(i32::checked_add, |a, b| a + b),
            Operator::Sub => self.arith(i32::checked_sub, |a, b| a - b),
            Operator::Mul => self.arith(i32::checked_mul, |a, b| a * b),
            Operator::Div => self.div(),
            Operator::Idiv => self.idiv(),
            Operator::Mod => self.modulo(),
            Operator::Neg => self.neg(),
            Operator::Abs => self.abs(),
            Operator::Ceiling => self.float_op(f64::ceil),
            Operator::Floor => self.float_op(f64::floor),
            // ties round away from zero
            Operator::Round => self.float_op(f64::round),
            Operator::Truncate => self.float_op(f64::trunc),
            Operator::Sqrt => self.sqrt(),
            Operator::Atan => self.atan(),
            Operator::Cos => self.real_op(|n| n.to_radians().cos()),
            Operator::Sin => self.real_op(|n| n.to_radians().sin()),
            Operator::Exp => self.exp(),
            Operator::Ln => self.ln(),
            Operator::Log => self.log(),
            Operator::Rand => self.rand(),
            Operator::SRand => self.srand(),
            Operator::RRand => {
                let state = self.rng_state;
                self.push(Object::int(state as i32));
                Ok(())
            }

            // relational, boolean, bitwise
            Operator::Eq => self.eq(),
            Operator::Ne => self.ne(),
            Operator::Lt => self.cmp(Ordering::is_lt),
            Operator::Le => self.cmp(Ordering::is_le),
            Operator::Gt => self.cmp(Ordering::is_gt),
            Operator::Ge => self.cmp(Ordering::is_ge),
            Operator::And => self.logic(|a, b| a && b, |a, b| a & b),
            Operator::Or => self.logic(|a, b| a || b, |a, b| a | b),
            Operator::Xor => self.logic(|a, b| a != b, |a, b| a ^ b),
            Operator::Not => self.not(),
            Operator::True => {
                self.push(Object::bool(true));
                Ok(())
            }
            Operator::False => {
                self.push(Object::bool(false));
                Ok(())
            }
            Operator::BitShift => self.bitshift(),

            // arrays and strings
            Operator::Array => self.array(),
            Operator::ArrayEnd => self.array_end(),
            Operator::String => self.string(),
            Operator::Length => self.length(),
            Operator::Get => self.get(),
            Operator::Put => self.put(),
            Operator::GetInterval => self.get_interval(),
            Operator::PutInterval => self.put_interval(),
            Operator::AStore => self.astore(),
            Operator::ALoad => self.aload(),
            Operator::ForAll => self.forall(),
            Operator::AnchorSearch => self.search_op(true),
            Operator::Search => self.search_op(false),
            Operator::Token => self.token(),

            // dictionaries
            Operator::Dict => self.dict(),
            Operator::DictEnd => self.dict_end(),
            Operator::MaxLength => self.max_length(),
            Operator::Begin => self.begin(),
            Operator::End => self.end(),
            Operator::Def => self.def(),
            Operator::Load => self.load_op(),
            Operator::Store => self.store(),
            Operator::Undef => self.undef(),
            Operator::Known => self.known(),
            Operator::Where => self.where_op(),
            Operator::CurrentDict => self.current_dict(),
            Operator::CountDictStack => {
                let count = self.dictionary_stack.len();
                self.push(Object::int(count as i32));
                Ok(())
            }
            Operator::DictStack => self.dict_stack(),
            Operator::ClearDictStack => {
                self.dictionary_stack.truncate(2);
                Ok(())
            }

            // control
            Operator::Exec => {
                let obj = self.pop()?;
                self.execute_object(obj, gtx)
            }
            Operator::If => self.if_op(),
            Operator::IfElse => self.if_else(),
            Operator::For => self.for_loop(),
            Operator::Repeat => self.repeat(),
            Operator::Loop => self.infinite_loop(),
            Operator::Exit => self.exit(),
            Operator::Stop => anyhow::bail!(StopSignal),
            Operator::Stopped => self.stopped(gtx),
            Operator::CountExecStack => {
                let count = self.execution_stack.len();
                self.push(Object::int(count as i32));
                Ok(())
            }
            Operator::ExecStack => self.exec_stack(),
            Operator::Quit => {
                self.done = true;
                Ok(())
            }
            Operator::Start => Ok(()),

            // type, attribute, conversion
            Operator::Type => self.object_type(),
            Operator::CvLit => self.set_executability(false),
            Operator::Cvx => self.set_executability(true),
            Operator::XCheck => {
                let obj = self.pop()?;
                self.push(Object::bool(obj.executable));
                Ok(())
            }
            Operator::ExecuteOnly => self.modify_access(Access::ExecuteOnly),
            Operator::NoAccess => self.modify_access(Access::None),
            Operator::ReadOnly => self.modify_access(Access::ReadOnly),
            Operator::RCheck => self.access_check(Access::readable),
            Operator::WCheck => self.access_check(Access::writable),
            Operator::Cvi => self.cvi(),
            Operator::Cvn => self.cvn(),
            Operator::Cvr => self.cvr(),
            Operator::Cvrs => self.cvrs(),
            Operator::Cvs => self.cvs(),

            // files
            Operator::CurrentFile => {
                let file = self.source_file;
                self.push(Object::literal(ObjectKind::File(file)));
                Ok(())
            }
            Operator::Filter => self.filter(),
            Operator::ReadString => self.read_string(),
            Operator::FileStub => anyhow::bail!(PostScriptError::UndefinedFilename),

            // miscellaneous
            Operator::Bind => self.bind(),
            Operator::Save => {
                self.save_counter += 1;
                let token = self.save_counter;
                self.push(Object::literal(ObjectKind::Save(token)));
                Ok(())
            }
            Operator::Restore => self.pop().map(drop),
            Operator::Null => {
                self.push(Object::literal(ObjectKind::Null));
                Ok(())
            }
            Operator::DebugPrint => {
                let obj = self.pop()?;
                log::info!(target: "eps::console", "{}", self.display_string(&obj));
                Ok(())
            }
            Operator::DebugPrintFull => {
                let obj = self.pop()?;
                log::info!(target: "eps::console", "{}", self.repr_string(&obj, 0));
                Ok(())
            }
            Operator::Print => {
                let s = self.pop_string()?;
                let text = String::from_utf8_lossy(self.vm.get_str(s).as_bytes()).into_owned();
                log::info!(target: "eps::console", "{}", text);
                Ok(())
            }
            Operator::Stack => {
                self.log_stack(false);
                Ok(())
            }
            Operator::PStack => {
                self.log_stack(true);
                Ok(())
            }

            // graphics, transforms, paths, painting, fonts
            op => self.execute_graphics_operator(op, gtx),
        }
    }
}

/// Operand stack operators
impl<'a> Interpreter<'a> {
    fn exch(&mut self) -> PostScriptResult<()> {
        let obj2 = self.pop()?;
        let obj1 = self.pop()?;

        self.push(obj2);
        self.push(obj1);

        Ok(())
    }

    fn dup(&mut self) -> PostScriptResult<()> {
        let obj = self.pop()?;

        self.push(obj.clone());
        self.push(obj);

        Ok(())
    }

    fn copy_n(&mut self) -> PostScriptResult<()> {
        let n = self.pop_usize()?;

        if n > self.operand_stack.len() {
            anyhow::bail!(PostScriptError::StackUnderflow);
        }

        let start = self.operand_stack.len() - n;

        for i in start..self.operand_stack.len() {
            let obj = self.operand_stack[i].clone();
            self.operand_stack.push(obj);
        }

        Ok(())
    }

    fn index(&mut self) -> PostScriptResult<()> {
        let n = self.pop_usize()?;

        if n >= self.operand_stack.len() {
            anyhow::bail!(PostScriptError::StackUnderflow);
        }

        let obj = self.operand_stack[self.operand_stack.len() - 1 - n].clone();
        self.push(obj);

        Ok(())
    }

    fn roll(&mut self) -> PostScriptResult<()> {
        let j = self.pop_int()?;
        let n = self.pop_int()?;

        if n < 0 {
            anyhow::bail!(PostScriptError::RangeCheck);
        }

        let n = n as usize;

        if n > self.operand_stack.len() {
            anyhow::bail!(PostScriptError::StackUnderflow);
        }

        if n == 0 {
            return Ok(());
        }

        // positive j rotates toward the top of the stack
        let rotations = j.rem_euclid(n as i32) as usize;

        let start = self.operand_stack.len() - n;
        self.operand_stack[start..].rotate_right(rotations);

        Ok(())
    }

    fn clear_to_mark(&mut self) -> PostScriptResult<()> {
        match self
            .operand_stack
            .iter()
            .rposition(Object::is_mark)
        {
            Some(pos) => {
                self.operand_stack.truncate(pos);
                Ok(())
            }
            None => anyhow::bail!(PostScriptError::UnmatchedMark),
        }
    }

    fn count_to_mark(&mut self) -> PostScriptResult<()> {
        match self
            .operand_stack
            .iter()
            .rposition(Object::is_mark)
        {
            Some(pos) => {
                let above = self.operand_stack.len() - pos - 1;
                self.push(Object::int(above as i32));
                Ok(())
            }
            None => anyhow::bail!(PostScriptError::UnmatchedMark),
        }
    }
}

/// Arithmetic operators
impl<'a> Interpreter<'a> {
    fn arith(
        &mut self,
        checked: impl Fn(i32, i32) -> Option<i32>,
        real: impl Fn(f64, f64) -> f64,
    ) -> PostScriptResult<()> {
        let n2 = self.pop()?;
        let n1 = self.pop()?;

        if n1.is_int() && n2.is_int() {
            let a = n1.into_int()?;
            let b = n2.into_int()?;

            match checked(a, b) {
                Some(result) => self.push(Object::int(result)),
                // integer overflow promotes the result to a real
                None => self.push(Object::real(real(f64::from(a), f64::from(b)))),
            }

            return Ok(());
        }

        let a = n1.into_real()?;
        let b = n2.into_real()?;

        self.push_checked_real(real(a, b))
    }

    fn push_checked_real(&mut self, n: f64) -> PostScriptResult<()> {
        if !n.is_finite() {
            anyhow::bail!(PostScriptError::UndefinedResult);
        }

        self.push(Object::real(n));

        Ok(())
    }

    fn div(&mut self) -> PostScriptResult<()> {
        let b = self.pop_number()?;
        let a = self.pop_number()?;

        if b == 0.0 {
            anyhow::bail!(PostScriptError::UndefinedResult);
        }

        self.push_checked_real(a / b)
    }

    fn idiv(&mut self) -> PostScriptResult<()> {
        let b = self.pop_int()?;
        let a = self.pop_int()?;

        if b == 0 {
            anyhow::bail!(PostScriptError::UndefinedResult);
        }

        match a.checked_div(b) {
            Some(q) => {
                self.push(Object::int(q));
                Ok(())
            }
            None => anyhow::bail!(PostScriptError::UndefinedResult),
        }
    }

    fn modulo(&mut self) -> PostScriptResult<()> {
        let b = self.pop_int()?;
        let a = self.pop_int()?;

        if b == 0 {
            anyhow::bail!(PostScriptError::UndefinedResult);
        }

        // i32::MIN mod -1 is mathematically zero
        let remainder = a.checked_rem(b).unwrap_or(0);

        self.push(Object::int(remainder));

        Ok(())
    }

    fn neg(&mut self) -> PostScriptResult<()> {
        match self.pop()?.kind {
            ObjectKind::Int(n) => match n.checked_neg() {
                Some(negated) => self.push(Object::int(negated)),
                None => self.push(Object::real(-f64::from(n))),
            },
            ObjectKind::Real(n) => self.push(Object::real(-n)),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }

        Ok(())
    }

    fn abs(&mut self) -> PostScriptResult<()> {
        match self.pop()?.kind {
            ObjectKind::Int(n) => match n.checked_abs() {
                Some(absolute) => self.push(Object::int(absolute)),
                None => self.push(Object::real(f64::from(n).abs())),
            },
            ObjectKind::Real(n) => self.push(Object::real(n.abs())),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }

        Ok(())
    }

    /// The rounding operators: integers pass through unchanged, reals stay
    /// real
    fn float_op(&mut self, func: impl Fn(f64) -> f64) -> PostScriptResult<()> {
        let n = self.pop()?;

        if n.is_int() {
            self.push(n);
            return Ok(());
        }

        let n = func(n.into_real()?);
        self.push(Object::real(n));

        Ok(())
    }

    /// The inherently real-valued unary operators
    fn real_op(&mut self, func: impl Fn(f64) -> f64) -> PostScriptResult<()> {
        let n = self.pop_number()?;

        self.push_checked_real(func(n))
    }

    fn sqrt(&mut self) -> PostScriptResult<()> {
        let n = self.pop_number()?;

        if n < 0.0 {
            anyhow::bail!(PostScriptError::UndefinedResult);
        }

        self.push(Object::real(n.sqrt()));

        Ok(())
    }

    fn atan(&mut self) -> PostScriptResult<()> {
        let den = self.pop_number()?;
        let num = self.pop_number()?;

        if num == 0.0 && den == 0.0 {
            anyhow::bail!(PostScriptError::UndefinedResult);
        }

        // result in degrees, in the range [0, 360)
        let mut degrees = num.atan2(den).to_degrees();

        if degrees < 0.0 {
            degrees += 360.0;
        }

        self.push(Object::real(degrees));

        Ok(())
    }

    fn exp(&mut self) -> PostScriptResult<()> {
        let exponent = self.pop_number()?;
        let base = self.pop_number()?;

        let result = base.powf(exponent);

        if result.is_nan() {
            anyhow::bail!(PostScriptError::UndefinedResult);
        }

        self.push_checked_real(result)
    }

    fn ln(&mut self) -> PostScriptResult<()> {
        let n = self.pop_number()?;

        if n <= 0.0 {
            anyhow::bail!(PostScriptError::UndefinedResult);
        }

        self.push(Object::real(n.ln()));

        Ok(())
    }

    fn log(&mut self) -> PostScriptResult<()> {
        let n = self.pop_number()?;

        if n <= 0.0 {
            anyhow::bail!(PostScriptError::UndefinedResult);
        }

        self.push(Object::real(n.log10()));

        Ok(())
    }

    fn advance_rng(&mut self) -> i32 {
        // 31-bit linear congruential step
        self.rng_state =
            ((u64::from(self.rng_state) * 1_103_515_245 + 12_345) & 0x7fff_ffff) as u32;

        self.rng_state as i32
    }

    fn rand(&mut self) -> PostScriptResult<()> {
        let n = self.advance_rng();
        self.push(Object::int(n));

        Ok(())
    }

    fn srand(&mut self) -> PostScriptResult<()> {
        let seed = self.pop_int()?;
        self.rng_state = (seed as u32) & 0x7fff_ffff;

        Ok(())
    }
}

/// Relational, boolean, and bitwise operators
impl<'a> Interpreter<'a> {
    /// Equality as defined for `eq`: types must be compatible (both
    /// numeric, both string-like, or an exact match), composites compare by
    /// identity, and the literal/executable attribute is ignored
    fn objects_equal(&self, a: &Object, b: &Object) -> bool {
        match (&a.kind, &b.kind) {
            (ObjectKind::Null, ObjectKind::Null) => true,
            (ObjectKind::Mark, ObjectKind::Mark) => true,
            (ObjectKind::Bool(b1), ObjectKind::Bool(b2)) => b1 == b2,
            (ObjectKind::Int(n1), ObjectKind::Int(n2)) => n1 == n2,
            (ObjectKind::Int(int), ObjectKind::Real(real))
            | (ObjectKind::Real(real), ObjectKind::Int(int)) => *real == f64::from(*int),
            (ObjectKind::Real(n1), ObjectKind::Real(n2)) => n1 == n2,
            (ObjectKind::Name(n1), ObjectKind::Name(n2)) => n1 == n2,
            (ObjectKind::Name(name), ObjectKind::String(s))
            | (ObjectKind::String(s), ObjectKind::Name(name)) => {
                name.as_bytes() == self.vm.get_str(*s).as_bytes()
            }
            (ObjectKind::String(s1), ObjectKind::String(s2)) => {
                s1 == s2 || self.vm.get_str(*s1) == self.vm.get_str(*s2)
            }
            (ObjectKind::Array(a1), ObjectKind::Array(a2))
            | (ObjectKind::PackedArray(a1), ObjectKind::PackedArray(a2))
            | (ObjectKind::Array(a1), ObjectKind::PackedArray(a2))
            | (ObjectKind::PackedArray(a1), ObjectKind::Array(a2)) => a1 == a2,
            (ObjectKind::Dictionary(d1), ObjectKind::Dictionary(d2)) => d1 == d2,
            (ObjectKind::Operator(o1), ObjectKind::Operator(o2)) => o1 == o2,
            (ObjectKind::File(f1), ObjectKind::File(f2)) => f1 == f2,
            (ObjectKind::FontId(f1), ObjectKind::FontId(f2)) => f1 == f2,
            (ObjectKind::Save(s1), ObjectKind::Save(s2)) => s1 == s2,
            _ => false,
        }
    }

    fn eq(&mut self) -> PostScriptResult<()> {
        let b = self.pop()?;
        let a = self.pop()?;

        let equal = self.objects_equal(&a, &b);
        self.push(Object::bool(equal));

        Ok(())
    }

    fn ne(&mut self) -> PostScriptResult<()> {
        let b = self.pop()?;
        let a = self.pop()?;

        let equal = self.objects_equal(&a, &b);
        self.push(Object::bool(!equal));

        Ok(())
    }

    /// Ordering for `lt`/`le`/`gt`/`ge`: numeric against numeric, string
    /// against string. Mixing the two is a typecheck
    fn cmp(&mut self, accept: impl Fn(Ordering) -> bool) -> PostScriptResult<()> {
        let b = self.pop()?;
        let a = self.pop()?;

        let ordering = match (&a.kind, &b.kind) {
            (ObjectKind::String(s1), ObjectKind::String(s2)) => {
                self.vm.get_str(*s1).cmp(self.vm.get_str(*s2))
            }
            _ if a.is_number() && b.is_number() => {
                let a = a.into_real()?;
                let b = b.into_real()?;

                a.partial_cmp(&b)
                    .ok_or(anyhow::anyhow!(PostScriptError::UndefinedResult))?
            }
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        };

        self.push(Object::bool(accept(ordering)));

        Ok(())
    }

    fn logic(
        &mut self,
        on_bool: impl Fn(bool, bool) -> bool,
        on_int: impl Fn(i32, i32) -> i32,
    ) -> PostScriptResult<()> {
        let b = self.pop()?;
        let a = self.pop()?;

        match (&a.kind, &b.kind) {
            (ObjectKind::Bool(b1), ObjectKind::Bool(b2)) => {
                self.push(Object::bool(on_bool(*b1, *b2)))
            }
            (ObjectKind::Int(n1), ObjectKind::Int(n2)) => {
                self.push(Object::int(on_int(*n1, *n2)))
            }
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }

        Ok(())
    }

    fn not(&mut self) -> PostScriptResult<()> {
        match self.pop()?.kind {
            ObjectKind::Bool(b) => self.push(Object::bool(!b)),
            ObjectKind::Int(n) => self.push(Object::int(!n)),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }

        Ok(())
    }

    fn bitshift(&mut self) -> PostScriptResult<()> {
        let shift = self.pop_int()?;
        let n = self.pop_int()?;

        let shifted = if shift >= 0 {
            n.checked_shl(shift as u32).unwrap_or(0)
        } else {
            n.checked_shr(shift.unsigned_abs()).unwrap_or(if n < 0 { -1 } else { 0 })
        };

        self.push(Object::int(shifted));

        Ok(())
    }
}

/// Array, string, and dictionary operators
impl<'a> Interpreter<'a> {
    fn array(&mut self) -> PostScriptResult<()> {
        let len = self.pop_usize()?;

        let idx = self.vm.new_array(PostScriptArray::new(len));
        self.push(Object::literal(ObjectKind::Array(idx)));

        Ok(())
    }

    fn string(&mut self) -> PostScriptResult<()> {
        let len = self.pop_usize()?;

        let idx = self.vm.new_string(PostScriptString::with_capacity(len));
        self.push(Object::literal(ObjectKind::String(idx)));

        Ok(())
    }

    fn array_end(&mut self) -> PostScriptResult<()> {
        let mut elements = Vec::new();

        loop {
            let obj = self
                .operand_stack
                .pop()
                .ok_or(anyhow::anyhow!(PostScriptError::UnmatchedMark))?;

            if obj.is_mark() {
                break;
            }

            elements.push(obj);
        }

        elements.reverse();

        let idx = self.vm.new_array(PostScriptArray::from_objects(elements));
        self.push(Object::literal(ObjectKind::Array(idx)));

        Ok(())
    }

    fn dict_end(&mut self) -> PostScriptResult<()> {
        let mut pairs = Vec::new();

        loop {
            let obj = self
                .operand_stack
                .pop()
                .ok_or(anyhow::anyhow!(PostScriptError::UnmatchedMark))?;

            if obj.is_mark() {
                break;
            }

            pairs.push(obj);
        }

        if pairs.len() % 2 != 0 {
            anyhow::bail!(PostScriptError::RangeCheck);
        }

        pairs.reverse();

        let mut dict = PostScriptDictionary::with_capacity((pairs.len() / 2).max(1));

        for pair in pairs.chunks_exact(2) {
            let key = self.object_to_dict_key(pair[0].clone())?;
            dict.insert(key, pair[1].clone())?;
        }

        let idx = self.vm.new_dict(dict);
        self.push(Object::literal(ObjectKind::Dictionary(idx)));

        Ok(())
    }

    fn length(&mut self) -> PostScriptResult<()> {
        let obj = self.pop()?;

        let len = match obj.kind {
            ObjectKind::Name(name) => name.len(),
            ObjectKind::String(s) => {
                self.check_readable(self.vm.get_str(s).access())?;
                self.vm.get_str(s).len()
            }
            ObjectKind::Array(a) | ObjectKind::PackedArray(a) => {
                self.check_readable(self.vm.get_arr(a).access())?;
                self.vm.get_arr(a).len()
            }
            ObjectKind::Dictionary(d) => {
                self.check_readable(self.vm.get_dict(d).access())?;
                self.vm.get_dict(d).len()
            }
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        };

        self.push(Object::int(len as i32));

        Ok(())
    }

    fn get(&mut self) -> PostScriptResult<()> {
        let key_or_index = self.pop()?;
        let container = self.pop()?;

        match container.kind {
            ObjectKind::Array(arr) | ObjectKind::PackedArray(arr) => {
                self.check_readable(self.vm.get_arr(arr).access())?;

                let idx = self.index_operand(key_or_index)?;
                let value = self.vm.get_arr(arr).get(idx)?.clone();

                self.push(value);
            }
            ObjectKind::String(s) => {
                self.check_readable(self.vm.get_str(s).access())?;

                let idx = self.index_operand(key_or_index)?;
                let byte = self.vm.get_str(s).get(idx)?;

                self.push(Object::int(i32::from(byte)));
            }
            ObjectKind::Dictionary(dict) => {
                self.check_readable(self.vm.get_dict(dict).access())?;

                let key = self.object_to_dict_key(key_or_index)?;

                let value = self
                    .vm
                    .get_dict(dict)
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| undefined_key(&key))?;

                self.push(value);
            }
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }

        Ok(())
    }

    fn put(&mut self) -> PostScriptResult<()> {
        let value = self.pop()?;
        let key_or_index = self.pop()?;
        let container = self.pop()?;

        match container.kind {
            ObjectKind::Array(arr) => {
                self.check_writable(self.vm.get_arr(arr).access())?;

                let idx = self.index_operand(key_or_index)?;
                self.vm.get_arr_mut(arr).put(idx, value)?;
            }
            ObjectKind::String(s) => {
                self.check_writable(self.vm.get_str(s).access())?;

                let idx = self.index_operand(key_or_index)?;
                let byte = u8::try_from(value.into_int()?)
                    .map_err(|_| anyhow::anyhow!(PostScriptError::RangeCheck))?;

                self.vm.get_str_mut(s).put(idx, byte)?;
            }
            ObjectKind::Dictionary(dict) => {
                self.check_writable(self.vm.get_dict(dict).access())?;

                let key = self.object_to_dict_key(key_or_index)?;
                self.vm.get_dict_mut(dict).insert(key, value)?;
            }
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }

        Ok(())
    }

    fn get_interval(&mut self) -> PostScriptResult<()> {
        let count = self.pop_usize()?;
        let index = self.pop_usize()?;
        let container = self.pop()?;

        match container.kind {
            ObjectKind::Array(arr) | ObjectKind::PackedArray(arr) => {
                self.check_readable(self.vm.get_arr(arr).access())?;

                let slice = self.vm.get_arr(arr).interval(index, count)?.to_vec();
                let idx = self.vm.new_array(PostScriptArray::from_objects(slice));

                self.push(Object::literal(ObjectKind::Array(idx)));
            }
            ObjectKind::String(s) => {
                self.check_readable(self.vm.get_str(s).access())?;

                let bytes = self.vm.get_str(s).substring(index, count)?.to_vec();
                let idx = self.vm.new_string(PostScriptString::from_bytes(bytes));

                self.push(Object::literal(ObjectKind::String(idx)));
            }
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }

        Ok(())
    }

    fn put_interval(&mut self) -> PostScriptResult<()> {
        let source = self.pop()?;
        let index = self.pop_usize()?;
        let target = self.pop()?;

        match (target.kind, source.kind) {
            (
                ObjectKind::Array(dst),
                ObjectKind::Array(src) | ObjectKind::PackedArray(src),
            ) => {
                self.check_writable(self.vm.get_arr(dst).access())?;
                self.check_readable(self.vm.get_arr(src).access())?;

                let elements = self.vm.get_arr(src).as_slice().to_vec();
                self.vm.get_arr_mut(dst).write_at(index, &elements)?;
            }
            (ObjectKind::String(dst), ObjectKind::String(src)) => {
                self.check_writable(self.vm.get_str(dst).access())?;
                self.check_readable(self.vm.get_str(src).access())?;

                let bytes = self.vm.get_str(src).as_bytes().to_vec();
                self.vm.get_str_mut(dst).write_at(index, &bytes)?;
            }
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }

        Ok(())
    }

    fn astore(&mut self) -> PostScriptResult<()> {
        let target = self.pop()?;

        let arr = match target.kind {
            ObjectKind::Array(arr) => arr,
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        };

        self.check_writable(self.vm.get_arr(arr).access())?;

        let len = self.vm.get_arr(arr).len();

        if self.operand_stack.len() < len {
            anyhow::bail!(PostScriptError::StackUnderflow);
        }

        let start = self.operand_stack.len() - len;
        let elements: Vec<Object> = self.operand_stack.drain(start..).collect();

        self.vm.get_arr_mut(arr).write_at(0, &elements)?;

        self.push(target);

        Ok(())
    }

    fn aload(&mut self) -> PostScriptResult<()> {
        let target = self.pop()?;

        let arr = match target.kind {
            ObjectKind::Array(arr) | ObjectKind::PackedArray(arr) => arr,
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        };

        self.check_readable(self.vm.get_arr(arr).access())?;

        let elements = self.vm.get_arr(arr).as_slice().to_vec();

        for element in elements {
            self.push(element);
        }

        self.push(target);

        Ok(())
    }

    /// `copy` between composite objects: fills the destination's prefix
    /// with the source's contents and pushes the receiving interval
    fn copy_composite(&mut self) -> PostScriptResult<()> {
        let destination = self.pop()?;
        let source = self.pop()?;

        match (&source.kind, &destination.kind) {
            (
                &(ObjectKind::Array(src) | ObjectKind::PackedArray(src)),
                &ObjectKind::Array(dst),
            ) => {
                self.check_readable(self.vm.get_arr(src).access())?;
                self.check_writable(self.vm.get_arr(dst).access())?;

                let elements = self.vm.get_arr(src).as_slice().to_vec();
                self.vm.get_arr_mut(dst).write_at(0, &elements)?;

                if elements.len() == self.vm.get_arr(dst).len() {
                    self.push(destination);
                } else {
                    let idx = self.vm.new_array(PostScriptArray::from_objects(elements));
                    self.push(Object::literal(ObjectKind::Array(idx)));
                }
            }
            (&ObjectKind::String(src), &ObjectKind::String(dst)) => {
                self.check_readable(self.vm.get_str(src).access())?;
                self.check_writable(self.vm.get_str(dst).access())?;

                let bytes = self.vm.get_str(src).as_bytes().to_vec();
                self.vm.get_str_mut(dst).write_at(0, &bytes)?;

                if bytes.len() == self.vm.get_str(dst).len() {
                    self.push(destination);
                } else {
                    let idx = self.vm.new_string(PostScriptString::from_bytes(bytes));
                    self.push(Object::literal(ObjectKind::String(idx)));
                }
            }
            (&ObjectKind::Dictionary(src), &ObjectKind::Dictionary(dst)) => {
                self.check_readable(self.vm.get_dict(src).access())?;
                self.check_writable(self.vm.get_dict(dst).access())?;

                let entries: Vec<(DictKey, Object)> = self
                    .vm
                    .get_dict(src)
                    .entries()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();

                for (key, value) in entries {
                    self.vm.get_dict_mut(dst).insert(key, value)?;
                }

                self.push(destination);
            }
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }

        Ok(())
    }

    fn forall(&mut self) -> PostScriptResult<()> {
        let body = self.pop_procedure()?;
        let container = self.pop()?;

        let kind = match container.kind {
            ObjectKind::Array(array) | ObjectKind::PackedArray(array) => {
                self.check_readable(self.vm.get_arr(array).access())?;
                LoopKind::ArrayForAll { array, index: 0 }
            }
            ObjectKind::String(string) => {
                self.check_readable(self.vm.get_str(string).access())?;
                LoopKind::StringForAll { string, index: 0 }
            }
            ObjectKind::Dictionary(dict) => {
                self.check_readable(self.vm.get_dict(dict).access())?;

                let keys = self.vm.get_dict(dict).keys().to_vec();
                LoopKind::DictForAll {
                    dict,
                    keys,
                    index: 0,
                }
            }
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        };

        self.push_loop(kind, body)
    }

    fn search_op(&mut self, anchored: bool) -> PostScriptResult<()> {
        let seek = self.pop_string()?;
        let haystack = self.pop_string()?;

        self.check_readable(self.vm.get_str(haystack).access())?;
        self.check_readable(self.vm.get_str(seek).access())?;

        let seek_bytes = self.vm.get_str(seek).as_bytes().to_vec();
        let haystack_str = self.vm.get_str(haystack);

        let position = if anchored {
            haystack_str
                .as_bytes()
                .starts_with(&seek_bytes)
                .then_some(0)
        } else {
            haystack_str.find(&seek_bytes)
        };

        match position {
            Some(pos) => {
                let bytes = haystack_str.as_bytes();

                let pre = bytes[..pos].to_vec();
                let matched = bytes[pos..pos + seek_bytes.len()].to_vec();
                let post = bytes[pos + seek_bytes.len()..].to_vec();

                let post = self.vm.intern_string(PostScriptString::from_bytes(post));
                let matched = self.vm.intern_string(PostScriptString::from_bytes(matched));

                self.push(post);

                if !anchored {
                    let pre = self.vm.intern_string(PostScriptString::from_bytes(pre));
                    self.push(matched);
                    self.push(pre);
                } else {
                    self.push(matched);
                }

                self.push(Object::bool(true));
            }
            None => {
                self.push(Object::literal(ObjectKind::String(haystack)));
                self.push(Object::bool(false));
            }
        }

        Ok(())
    }

    /// Reads one token from a string using the program scanner's grammar
    fn token(&mut self) -> PostScriptResult<()> {
        let s = self.pop_string()?;

        self.check_readable(self.vm.get_str(s).access())?;

        let bytes = self.vm.get_str(s).as_bytes().to_vec();
        let total = bytes.len();

        let mut scanner = Scanner::new(Cow::Owned(bytes));

        match scanner.next_object(&mut self.vm)? {
            Some(obj) => {
                let rest = scanner.read_to_end();
                debug_assert!(rest.len() <= total);

                let post = self.vm.intern_string(PostScriptString::from_bytes(rest));

                self.push(post);
                self.push(obj);
                self.push(Object::bool(true));
            }
            None => {
                self.push(Object::bool(false));
            }
        }

        Ok(())
    }

    fn dict(&mut self) -> PostScriptResult<()> {
        let capacity = self.pop_usize()?;

        if capacity > self.limits.max_dict_capacity {
            anyhow::bail!(PostScriptError::LimitCheck);
        }

        let idx = self
            .vm
            .new_dict(PostScriptDictionary::with_capacity(capacity));

        self.push(Object::literal(ObjectKind::Dictionary(idx)));

        Ok(())
    }

    fn max_length(&mut self) -> PostScriptResult<()> {
        let dict = self.pop_dict()?;

        let capacity = self.vm.get_dict(dict).capacity();
        self.push(Object::int(capacity as i32));

        Ok(())
    }

    fn begin(&mut self) -> PostScriptResult<()> {
        let dict = self.pop_dict()?;

        self.dictionary_stack.push(dict);

        Ok(())
    }

    fn end(&mut self) -> PostScriptResult<()> {
        // the bottom two dictionaries are permanent
        if self.dictionary_stack.len() <= 2 {
            anyhow::bail!(PostScriptError::DictStackUnderflow);
        }

        self.dictionary_stack.pop();

        Ok(())
    }

    fn def(&mut self) -> PostScriptResult<()> {
        let value = self.pop()?;
        let key_obj = self.pop()?;
        let key = self.object_to_dict_key(key_obj)?;

        let current = *self
            .dictionary_stack
            .last()
            .ok_or(anyhow::anyhow!(PostScriptError::DictStackUnderflow))?;

        self.check_writable(self.vm.get_dict(current).access())?;

        self.vm.get_dict_mut(current).insert(key, value)?;

        Ok(())
    }

    fn load_op(&mut self) -> PostScriptResult<()> {
        let key_obj = self.pop()?;
        let key = self.object_to_dict_key(key_obj)?;

        let value = self
            .find_defining_dict(&key)
            .and_then(|dict| self.vm.get_dict(dict).get(&key).cloned())
            .ok_or_else(|| undefined_key(&key))?;

        self.push(value);

        Ok(())
    }

    fn store(&mut self) -> PostScriptResult<()> {
        let value = self.pop()?;
        let key_obj = self.pop()?;
        let key = self.object_to_dict_key(key_obj)?;

        let target = self
            .find_defining_dict(&key)
            .unwrap_or_else(|| *self.dictionary_stack.last().unwrap());

        self.check_writable(self.vm.get_dict(target).access())?;

        self.vm.get_dict_mut(target).insert(key, value)?;

        Ok(())
    }

    fn undef(&mut self) -> PostScriptResult<()> {
        let key_obj = self.pop()?;
        let key = self.object_to_dict_key(key_obj)?;
        let dict = self.pop_dict()?;

        self.check_writable(self.vm.get_dict(dict).access())?;

        // removing an absent key is not an error
        self.vm.get_dict_mut(dict).remove(&key);

        Ok(())
    }

    fn known(&mut self) -> PostScriptResult<()> {
        let key_obj = self.pop()?;
        let key = self.object_to_dict_key(key_obj)?;
        let dict = self.pop_dict()?;

        let contains = self.vm.get_dict(dict).contains(&key);
        self.push(Object::bool(contains));

        Ok(())
    }

    fn where_op(&mut self) -> PostScriptResult<()> {
        let key_obj = self.pop()?;
        let key = self.object_to_dict_key(key_obj)?;

        match self.find_defining_dict(&key) {
            Some(dict) => {
                self.push(Object::literal(ObjectKind::Dictionary(dict)));
                self.push(Object::bool(true));
            }
            None => self.push(Object::bool(false)),
        }

        Ok(())
    }

    fn current_dict(&mut self) -> PostScriptResult<()> {
        let current = *self
            .dictionary_stack
            .last()
            .ok_or(anyhow::anyhow!(PostScriptError::DictStackUnderflow))?;

        self.push(Object::literal(ObjectKind::Dictionary(current)));

        Ok(())
    }

    fn dict_stack(&mut self) -> PostScriptResult<()> {
        let target = self.pop()?;

        let arr = match target.kind {
            ObjectKind::Array(arr) => arr,
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        };

        self.check_writable(self.vm.get_arr(arr).access())?;

        let dicts: Vec<Object> = self
            .dictionary_stack
            .iter()
            .map(|&d| Object::literal(ObjectKind::Dictionary(d)))
            .collect();

        if dicts.len() > self.vm.get_arr(arr).len() {
            anyhow::bail!(PostScriptError::RangeCheck);
        }

        self.vm.get_arr_mut(arr).write_at(0, &dicts)?;

        if dicts.len() == self.vm.get_arr(arr).len() {
            self.push(target);
        } else {
            let idx = self.vm.new_array(PostScriptArray::from_objects(dicts));
            self.push(Object::literal(ObjectKind::Array(idx)));
        }

        Ok(())
    }

    fn find_defining_dict(&self, key: &DictKey) -> Option<DictionaryIndex> {
        self.dictionary_stack
            .iter()
            .rev()
            .copied()
            .find(|&dict| self.vm.get_dict(dict).contains(key))
    }
}

/// Control operators and loop contexts
impl<'a> Interpreter<'a> {
    fn if_op(&mut self) -> PostScriptResult<()> {
        let body = self.pop_procedure()?;
        let condition = self.pop_bool()?;

        if condition {
            self.push_activation(body);
        }

        Ok(())
    }

    fn if_else(&mut self) -> PostScriptResult<()> {
        let alternative = self.pop_procedure()?;
        let consequent = self.pop_procedure()?;
        let condition = self.pop_bool()?;

        self.push_activation(if condition { consequent } else { alternative });

        Ok(())
    }

    fn for_loop(&mut self) -> PostScriptResult<()> {
        let body = self.pop_procedure()?;
        let limit_obj = self.pop()?;
        let step_obj = self.pop()?;
        let initial_obj = self.pop()?;

        let integer =
            initial_obj.is_int() && step_obj.is_int() && limit_obj.is_int();

        let kind = LoopKind::For {
            control: initial_obj.into_real()?,
            step: step_obj.into_real()?,
            limit: limit_obj.into_real()?,
            integer,
        };

        self.push_loop(kind, body)
    }

    fn repeat(&mut self) -> PostScriptResult<()> {
        let body = self.pop_procedure()?;
        let count = self.pop_int()?;

        if count < 0 {
            anyhow::bail!(PostScriptError::RangeCheck);
        }

        self.push_loop(LoopKind::Repeat { remaining: count }, body)
    }

    fn infinite_loop(&mut self) -> PostScriptResult<()> {
        let body = self.pop_procedure()?;

        self.push_loop(LoopKind::Infinite, body)
    }

    fn push_loop(&mut self, kind: LoopKind, body: ArrayIndex) -> PostScriptResult<()> {
        if self.loop_stack.len() >= self.limits.max_loop_depth {
            anyhow::bail!(PostScriptError::LimitCheck);
        }

        self.loop_stack.push(LoopContext {
            kind,
            body,
            depth: self.execution_stack.len(),
        });

        Ok(())
    }

    /// Advances the topmost ready looping context: pops it if finished,
    /// otherwise pushes its loop variables and a fresh activation of its
    /// body
    fn drive_loop(&mut self) -> PostScriptResult<()> {
        let mut ctx = self.loop_stack.pop().unwrap();
        let body = ctx.body;

        let advanced = match &mut ctx.kind {
            LoopKind::Repeat { remaining } => {
                if *remaining == 0 {
                    false
                } else {
                    *remaining -= 1;
                    true
                }
            }
            LoopKind::For {
                control,
                step,
                limit,
                integer,
            } => {
                let finished = if *step >= 0.0 {
                    *control > *limit
                } else {
                    *control < *limit
                };

                if finished {
                    false
                } else {
                    let value = if *integer
                        && control.fract() == 0.0
                        && (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(control)
                    {
                        Object::int(*control as i32)
                    } else {
                        Object::real(*control)
                    };

                    self.operand_stack.push(value);
                    *control += *step;
                    true
                }
            }
            LoopKind::Infinite => true,
            LoopKind::ArrayForAll { array, index } => {
                let element = {
                    let arr = self.vm.get_arr(*array);
                    arr.as_slice().get(*index).cloned()
                };

                match element {
                    Some(element) => {
                        *index += 1;
                        self.operand_stack.push(element);
                        true
                    }
                    None => false,
                }
            }
            LoopKind::StringForAll { string, index } => {
                let byte = self.vm.get_str(*string).as_bytes().get(*index).copied();

                match byte {
                    Some(byte) => {
                        *index += 1;
                        self.operand_stack.push(Object::int(i32::from(byte)));
                        true
                    }
                    None => false,
                }
            }
            LoopKind::DictForAll { dict, keys, index } => loop {
                let key = match keys.get(*index) {
                    Some(key) => key.clone(),
                    None => break false,
                };

                *index += 1;

                // entries removed since the snapshot are skipped
                if let Some(value) = self.vm.get_dict(*dict).get(&key).cloned() {
                    self.operand_stack.push(key.to_object());
                    self.operand_stack.push(value);
                    break true;
                }
            },
        };

        if advanced {
            self.push_activation(body);
            self.loop_stack.push(ctx);
        }

        Ok(())
    }

    /// Terminates the innermost loop: truncates the execution stack back to
    /// the loop's recorded depth and discards the loop context
    fn exit(&mut self) -> PostScriptResult<()> {
        match self.loop_stack.pop() {
            Some(ctx) => {
                self.execution_stack.truncate(ctx.depth);
                Ok(())
            }
            None => anyhow::bail!(PostScriptError::InvalidExit),
        }
    }

    /// Runs its operand inside a nested drive loop, catching raised errors
    /// and `stop`. The operand stack is left exactly as the interrupted
    /// program left it; the execution and loop stacks are unwound
    fn stopped(&mut self, gtx: &mut dyn GraphicsContext) -> PostScriptResult<()> {
        let obj = self.pop()?;

        let exec_depth = self.execution_stack.len();
        let loop_depth = self.loop_stack.len();

        let outcome = self.execute_object(obj, gtx).and_then(|()| {
            while self.execution_stack.len() > exec_depth
                || self.loop_stack.len() > loop_depth
            {
                if !self.tick(gtx)? {
                    break;
                }
            }

            Ok(())
        });

        match outcome {
            Ok(()) => {
                self.push(Object::bool(false));
                Ok(())
            }
            Err(err)
                if err.is::<StopSignal>() || err.downcast_ref::<PostScriptError>().is_some() =>
            {
                self.execution_stack.truncate(exec_depth);
                self.loop_stack.truncate(loop_depth);
                self.push(Object::bool(true));
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn exec_stack(&mut self) -> PostScriptResult<()> {
        let target = self.pop()?;

        let arr = match target.kind {
            ObjectKind::Array(arr) => arr,
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        };

        self.check_writable(self.vm.get_arr(arr).access())?;

        // procedure frames are represented by their arrays, scanner frames
        // by the source file object
        let snapshot: Vec<Object> = self
            .execution_stack
            .iter()
            .map(|frame| match frame {
                ExecFrame::Scanner(..) => {
                    Object::literal(ObjectKind::File(self.source_file))
                }
                ExecFrame::Procedure { array, .. } => {
                    Object::executable(ObjectKind::Array(*array))
                }
            })
            .collect();

        if snapshot.len() > self.vm.get_arr(arr).len() {
            anyhow::bail!(PostScriptError::RangeCheck);
        }

        self.vm.get_arr_mut(arr).write_at(0, &snapshot)?;

        if snapshot.len() == self.vm.get_arr(arr).len() {
            self.push(target);
        } else {
            let idx = self.vm.new_array(PostScriptArray::from_objects(snapshot));
            self.push(Object::literal(ObjectKind::Array(idx)));
        }

        Ok(())
    }
}

/// Type, attribute, and conversion operators
impl<'a> Interpreter<'a> {
    fn object_type(&mut self) -> PostScriptResult<()> {
        let obj = self.pop()?;

        let name = Name::from_bytes(obj.type_name().to_vec());
        self.push(Object::executable(ObjectKind::Name(name)));

        Ok(())
    }

    fn set_executability(&mut self, executable: bool) -> PostScriptResult<()> {
        let mut obj = self.pop()?;

        obj.executable = executable;
        self.push(obj);

        Ok(())
    }

    /// `executeonly`, `noaccess`, and `readonly` downgrade a container's
    /// access; attempting to restore a laxer attribute is invalidaccess
    fn modify_access(&mut self, access: Access) -> PostScriptResult<()> {
        let obj = self.pop()?;

        let current = match obj.kind {
            ObjectKind::Array(arr) | ObjectKind::PackedArray(arr) => {
                self.vm.get_arr(arr).access()
            }
            ObjectKind::String(s) => self.vm.get_str(s).access(),
            ObjectKind::Dictionary(dict) => self.vm.get_dict(dict).access(),
            ObjectKind::File(..) => Access::Unlimited,
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        };

        if !access.is_at_most(current) {
            anyhow::bail!(PostScriptError::InvalidAccess);
        }

        match obj.kind {
            ObjectKind::Array(arr) | ObjectKind::PackedArray(arr) => {
                self.vm.get_arr_mut(arr).set_access(access)
            }
            ObjectKind::String(s) => self.vm.get_str_mut(s).set_access(access),
            ObjectKind::Dictionary(dict) => self.vm.get_dict_mut(dict).set_access(access),
            ObjectKind::File(..) => {}
            _ => unreachable!(),
        }

        self.push(obj);

        Ok(())
    }

    fn access_check(&mut self, test: impl Fn(Access) -> bool) -> PostScriptResult<()> {
        let obj = self.pop()?;

        let access = match obj.kind {
            ObjectKind::Array(arr) | ObjectKind::PackedArray(arr) => {
                self.vm.get_arr(arr).access()
            }
            ObjectKind::String(s) => self.vm.get_str(s).access(),
            ObjectKind::Dictionary(dict) => self.vm.get_dict(dict).access(),
            ObjectKind::File(..) => Access::Unlimited,
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        };

        self.push(Object::bool(test(access)));

        Ok(())
    }

    fn cvi(&mut self) -> PostScriptResult<()> {
        let n = self.numeric_value_of_top()?;

        if !(f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(&n.trunc()) {
            anyhow::bail!(PostScriptError::RangeCheck);
        }

        self.push(Object::int(n.trunc() as i32));

        Ok(())
    }

    fn cvr(&mut self) -> PostScriptResult<()> {
        let n = self.numeric_value_of_top()?;

        self.push(Object::real(n));

        Ok(())
    }

    /// Numeric strings are parsed with the same grammar the scanner uses
    fn numeric_value_of_top(&mut self) -> PostScriptResult<f64> {
        match self.pop()?.kind {
            ObjectKind::Int(n) => Ok(f64::from(n)),
            ObjectKind::Real(n) => Ok(n),
            ObjectKind::String(s) => {
                let bytes = self.vm.get_str(s).as_bytes();
                let trimmed: Vec<u8> = bytes
                    .iter()
                    .copied()
                    .skip_while(u8::is_ascii_whitespace)
                    .collect();
                let end = trimmed
                    .iter()
                    .position(u8::is_ascii_whitespace)
                    .unwrap_or(trimmed.len());

                match parse_number(&trimmed[..end]) {
                    Some(Number::Int(n)) => Ok(f64::from(n)),
                    Some(Number::Real(n)) => Ok(n),
                    None => anyhow::bail!(PostScriptError::TypeCheck),
                }
            }
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    fn cvn(&mut self) -> PostScriptResult<()> {
        let obj = self.pop()?;

        let s = match obj.kind {
            ObjectKind::String(s) => s,
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        };

        let name = Name::from_bytes(self.vm.get_str(s).as_bytes().to_vec());

        // the result keeps the string's executability
        self.push(Object {
            kind: ObjectKind::Name(name),
            executable: obj.executable,
        });

        Ok(())
    }

    fn cvrs(&mut self) -> PostScriptResult<()> {
        let target = self.pop()?;
        let radix = self.pop_int()?;
        let num = self.pop()?;

        if !(2..=36).contains(&radix) {
            anyhow::bail!(PostScriptError::RangeCheck);
        }

        let text = if radix == 10 {
            self.display_string(&num)
        } else {
            // for other radices the number is treated as a 32-bit pattern
            let bits = num.into_int()? as u32;
            to_radix_string(bits, radix as u32)
        };

        self.write_into_string(target, text.as_bytes())
    }

    fn cvs(&mut self) -> PostScriptResult<()> {
        let target = self.pop()?;
        let obj = self.pop()?;

        let text = self.display_string(&obj);

        self.write_into_string(target, text.as_bytes())
    }

    /// Writes `bytes` into the front of a string operand and pushes the
    /// interval written
    fn write_into_string(&mut self, target: Object, bytes: &[u8]) -> PostScriptResult<()> {
        let s = match target.kind {
            ObjectKind::String(s) => s,
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        };

        self.check_writable(self.vm.get_str(s).access())?;

        if bytes.len() > self.vm.get_str(s).len() {
            anyhow::bail!(PostScriptError::RangeCheck);
        }

        self.vm.get_str_mut(s).write_at(0, bytes)?;

        if bytes.len() == self.vm.get_str(s).len() {
            self.push(target);
        } else {
            let idx = self
                .vm
                .new_string(PostScriptString::from_bytes(bytes.to_vec()));
            self.push(Object::literal(ObjectKind::String(idx)));
        }

        Ok(())
    }
}

/// File operators
impl<'a> Interpreter<'a> {
    /// The topmost open scanner, which is what `currentfile` denotes
    fn top_scanner(&mut self) -> Option<&mut Scanner<'a>> {
        self.execution_stack
            .iter_mut()
            .rev()
            .find_map(|frame| match frame {
                ExecFrame::Scanner(scanner) => Some(scanner),
                _ => None,
            })
    }

    fn filter(&mut self) -> PostScriptResult<()> {
        let name = self.pop()?;
        let source = self.pop()?;

        let filter_name = match name.kind {
            ObjectKind::Name(name) => name,
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        };

        let kind = FilterKind::from_name(filter_name.as_bytes())
            .ok_or(anyhow::anyhow!(PostScriptError::UndefinedFilename))?;

        let encoded = match source.kind {
            ObjectKind::File(file) => {
                if matches!(self.vm.files.get(&file), Some(FileStream::Source)) {
                    // encoded data follows the filter call in the program
                    // source itself, delimited by the filter's EOD marker
                    let marker = kind.eod_marker();

                    let scanner = self
                        .top_scanner()
                        .ok_or(anyhow::anyhow!(PostScriptError::UndefinedFilename))?;

                    scanner.skip_data_separator();

                    match marker {
                        Some(marker) => scanner.read_until(marker),
                        None => scanner.read_to_end(),
                    }
                } else {
                    self.vm.get_file_mut(file).read(usize::MAX)?
                }
            }
            ObjectKind::String(s) => self.vm.get_str(s).as_bytes().to_vec(),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        };

        let decoded = kind.decode(&encoded)?;

        let file = self.vm.new_file(FileStream::from_bytes(decoded));
        self.push(Object::literal(ObjectKind::File(file)));

        Ok(())
    }

    fn read_string(&mut self) -> PostScriptResult<()> {
        let target = self.pop()?;
        let file = self.pop_file()?;

        let s = match target.kind {
            ObjectKind::String(s) => s,
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        };

        self.check_writable(self.vm.get_str(s).access())?;

        let capacity = self.vm.get_str(s).len();

        let bytes = if matches!(self.vm.files.get(&file), Some(FileStream::Source)) {
            let scanner = self
                .top_scanner()
                .ok_or(anyhow::anyhow!(PostScriptError::UndefinedFilename))?;

            scanner.skip_data_separator();
            scanner.read_raw(capacity)
        } else {
            self.vm.get_file_mut(file).read(capacity)?
        };

        let filled = bytes.len() == capacity;

        self.vm.get_str_mut(s).write_at(0, &bytes)?;

        if filled {
            self.push(target);
        } else {
            let idx = self.vm.new_string(PostScriptString::from_bytes(bytes));
            self.push(Object::literal(ObjectKind::String(idx)));
        }

        self.push(Object::bool(filled));

        Ok(())
    }
}

/// bind and the console operators
impl<'a> Interpreter<'a> {
    /// Walks a procedure and substitutes executable-name references that
    /// currently resolve to operators with the operator objects themselves,
    /// recursing into nested writable procedures
    fn bind(&mut self) -> PostScriptResult<()> {
        let target = self.pop()?;

        let proc = match target.kind {
            ObjectKind::Array(arr) => arr,
            ObjectKind::PackedArray(arr) => arr,
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        };

        let mut visited = Vec::new();
        self.bind_array(proc, &mut visited)?;

        self.push(target);

        Ok(())
    }

    fn bind_array(
        &mut self,
        proc: ArrayIndex,
        visited: &mut Vec<ArrayIndex>,
    ) -> PostScriptResult<()> {
        // procedures can reference themselves through names or puts
        if visited.contains(&proc) {
            return Ok(());
        }

        visited.push(proc);

        if !self.vm.get_arr(proc).access().writable() {
            return Ok(());
        }

        for i in 0..self.vm.get_arr(proc).len() {
            let element = self.vm.get_arr(proc).as_slice()[i].clone();

            match element {
                Object {
                    kind: ObjectKind::Name(name),
                    executable: true,
                } => {
                    if let Ok(Object {
                        kind: ObjectKind::Operator(idx),
                        ..
                    }) = self.lookup(&name)
                    {
                        self.vm
                            .get_arr_mut(proc)
                            .put(i, Object::executable(ObjectKind::Operator(idx)))?;
                    }
                }
                Object {
                    kind: ObjectKind::Array(nested),
                    executable: true,
                } => {
                    self.bind_array(nested, visited)?;
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// The text form produced by `cvs` and `=`
    fn display_string(&self, obj: &Object) -> String {
        match &obj.kind {
            ObjectKind::Null => "null".to_owned(),
            ObjectKind::Bool(b) => b.to_string(),
            ObjectKind::Int(n) => n.to_string(),
            ObjectKind::Real(n) => format_real(*n),
            ObjectKind::Name(name) => String::from_utf8_lossy(name.as_bytes()).into_owned(),
            ObjectKind::String(s) => {
                String::from_utf8_lossy(self.vm.get_str(*s).as_bytes()).into_owned()
            }
            ObjectKind::Operator(idx) => builtin::operator_table()[idx.0].name.to_owned(),
            _ => "--nostringval--".to_owned(),
        }
    }

    /// The syntactic form produced by `==`
    fn repr_string(&self, obj: &Object, depth: usize) -> String {
        if depth > 8 {
            return "...".to_owned();
        }

        match &obj.kind {
            ObjectKind::Name(name) if !obj.executable => {
                format!("/{}", String::from_utf8_lossy(name.as_bytes()))
            }
            ObjectKind::String(s) => {
                format!(
                    "({})",
                    String::from_utf8_lossy(self.vm.get_str(*s).as_bytes())
                )
            }
            ObjectKind::Array(arr) | ObjectKind::PackedArray(arr) => {
                let (open, close) = if obj.executable { ("{", "}") } else { ("[", "]") };

                let inner: Vec<String> = self
                    .vm
                    .get_arr(*arr)
                    .as_slice()
                    .iter()
                    .map(|element| self.repr_string(element, depth + 1))
                    .collect();

                format!("{}{}{}", open, inner.join(" "), close)
            }
            ObjectKind::Dictionary(..) => "-dict-".to_owned(),
            ObjectKind::Mark => "-mark-".to_owned(),
            ObjectKind::File(..) => "-file-".to_owned(),
            _ => self.display_string(obj),
        }
    }

    fn log_stack(&self, syntactic: bool) {
        for obj in self.operand_stack.iter().rev() {
            let line = if syntactic {
                self.repr_string(obj, 0)
            } else {
                self.display_string(obj)
            };

            log::info!(target: "eps::console", "{}", line);
        }
    }
}

/// Typed pop helpers and access checks
impl<'a> Interpreter<'a> {
    pub(crate) fn push(&mut self, obj: Object) {
        self.operand_stack.push(obj);
    }

    pub(crate) fn pop(&mut self) -> PostScriptResult<Object> {
        self.operand_stack
            .pop()
            .ok_or(anyhow::anyhow!(PostScriptError::StackUnderflow))
    }

    pub(crate) fn pop_int(&mut self) -> PostScriptResult<i32> {
        match self.pop()?.kind {
            ObjectKind::Int(n) => Ok(n),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    /// A nonnegative integer operand used as a size or index
    pub(crate) fn pop_usize(&mut self) -> PostScriptResult<usize> {
        let n = self.pop_int()?;

        usize::try_from(n).map_err(|_| anyhow::anyhow!(PostScriptError::RangeCheck))
    }

    pub(crate) fn pop_number(&mut self) -> PostScriptResult<f64> {
        self.pop()?.into_real()
    }

    pub(crate) fn pop_bool(&mut self) -> PostScriptResult<bool> {
        match self.pop()?.kind {
            ObjectKind::Bool(b) => Ok(b),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    pub(crate) fn pop_name(&mut self) -> PostScriptResult<Name> {
        match self.pop()?.kind {
            ObjectKind::Name(name) => Ok(name),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    pub(crate) fn pop_string(&mut self) -> PostScriptResult<StringIndex> {
        match self.pop()?.kind {
            ObjectKind::String(s) => Ok(s),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    pub(crate) fn pop_array(&mut self) -> PostScriptResult<ArrayIndex> {
        match self.pop()?.kind {
            ObjectKind::Array(arr) | ObjectKind::PackedArray(arr) => Ok(arr),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    pub(crate) fn pop_dict(&mut self) -> PostScriptResult<DictionaryIndex> {
        match self.pop()?.kind {
            ObjectKind::Dictionary(dict) => Ok(dict),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    pub(crate) fn pop_file(&mut self) -> PostScriptResult<FileIndex> {
        match self.pop()?.kind {
            ObjectKind::File(file) => Ok(file),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    /// Procedure operands must be executable arrays
    pub(crate) fn pop_procedure(&mut self) -> PostScriptResult<ArrayIndex> {
        match self.pop()? {
            Object {
                kind: ObjectKind::Array(arr) | ObjectKind::PackedArray(arr),
                executable: true,
            } => Ok(arr),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    fn index_operand(&self, obj: Object) -> PostScriptResult<usize> {
        match obj.kind {
            ObjectKind::Int(n) => {
                usize::try_from(n).map_err(|_| anyhow::anyhow!(PostScriptError::RangeCheck))
            }
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    pub(crate) fn object_to_dict_key(&self, obj: Object) -> PostScriptResult<DictKey> {
        match obj.kind {
            ObjectKind::Name(name) => Ok(DictKey::Name(name)),
            ObjectKind::String(s) => Ok(DictKey::name(self.vm.get_str(s).as_bytes())),
            ObjectKind::Int(n) => Ok(DictKey::Integer(n)),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    pub(crate) fn check_readable(&self, access: Access) -> PostScriptResult<()> {
        if !access.readable() {
            anyhow::bail!(PostScriptError::InvalidAccess);
        }

        Ok(())
    }

    pub(crate) fn check_writable(&self, access: Access) -> PostScriptResult<()> {
        if !access.writable() {
            anyhow::bail!(PostScriptError::InvalidAccess);
        }

        Ok(())
    }

    pub(crate) fn vm_mut(&mut self) -> &mut Vm {
        &mut self.vm
    }

    pub(crate) fn font_directory(&self) -> DictionaryIndex {
        self.font_directory
    }

    pub(crate) fn font_registry(&self) -> Option<&dyn FontHost> {
        self.font_registry.as_deref()
    }
}

fn undefined_key(key: &DictKey) -> anyhow::Error {
    let name = match key {
        DictKey::Name(name) => name.clone(),
        DictKey::Integer(n) => Name::from_bytes(n.to_string().into_bytes()),
    };

    anyhow::anyhow!(PostScriptError::Undefined { name })
}

/// Reals print with a decimal point so they read back as reals
fn format_real(n: f64) -> String {
    if n == n.trunc() && n.abs() < 1e15 {
        format!("{:.1}", n)
    } else {
        n.to_string()
    }
}

fn to_radix_string(mut n: u32, radix: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    if n == 0 {
        return "0".to_owned();
    }

    let mut out = Vec::new();

    while n > 0 {
        out.push(DIGITS[(n % radix) as usize]);
        n /= radix;
    }

    out.reverse();

    String::from_utf8(out).unwrap()
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::render::RecordingContext;

    /// Assert the next operand on the stack is a string with the given
    /// contents
    macro_rules! assert_string {
        ($interpreter:ident, $str:literal) => {
            let s = $interpreter.pop_string().unwrap();
            let resolved = $interpreter.vm().get_str(s);
            assert_eq!(resolved.as_bytes(), $str);
        };
    }

    fn run(source: &[u8]) -> Interpreter {
        let mut interpreter = Interpreter::load(source).unwrap();
        let mut ctx = RecordingContext::new(400.0);

        interpreter.run(&mut ctx).unwrap();

        interpreter
    }

    /// Drives the interpreter until it errors and returns the error kind
    fn run_expecting_error(source: &[u8]) -> (Interpreter, &'static str) {
        let mut interpreter = Interpreter::load(source).unwrap();
        let mut ctx = RecordingContext::new(400.0);

        loop {
            match interpreter.step(&mut ctx) {
                Step::Running => {}
                Step::Finished => panic!("program finished without error"),
                Step::Error { kind, .. } => return (interpreter, kind),
            }
        }
    }

    #[test]
    fn add_two_integers() {
        let mut interpreter = run(b"1 2 add");

        assert_eq!(interpreter.pop().unwrap(), Object::int(3));
        assert!(interpreter.pop().is_err());
    }

    #[test]
    fn add_two_floats() {
        let mut interpreter = run(b"1.0 2.0 add");

        assert_eq!(interpreter.pop().unwrap(), Object::real(3.0));
        assert!(interpreter.pop().is_err());
    }

    #[test]
    fn add_int_and_float() {
        let mut interpreter = run(b"1 2.0 add");

        assert_eq!(interpreter.pop().unwrap(), Object::real(3.0));
    }

    #[test]
    fn add_overflow_promotes_to_real() {
        let mut interpreter = run(b"2147483647 1 add");

        assert_eq!(interpreter.pop().unwrap(), Object::real(2147483648.0));
    }

    #[test]
    fn modulo() {
        let mut interpreter = run(b"10 3 mod");

        assert_eq!(interpreter.pop().unwrap(), Object::int(1));
    }

    #[test]
    fn modulo_sign_follows_dividend() {
        let mut interpreter = run(b"-7 3 mod");

        assert_eq!(interpreter.pop().unwrap(), Object::int(-1));
    }

    #[test]
    fn floor_of_negative_real() {
        let mut interpreter = run(b"-3.1 floor");

        assert_eq!(interpreter.pop().unwrap(), Object::real(-4.0));
    }

    #[test]
    fn div_is_always_real() {
        let mut interpreter = run(b"6 2 div");

        assert_eq!(interpreter.pop().unwrap(), Object::real(3.0));
    }

    #[test]
    fn idiv_truncates() {
        let mut interpreter = run(b"7 2 idiv");

        assert_eq!(interpreter.pop().unwrap(), Object::int(3));
    }

    #[test]
    fn division_by_zero() {
        let (_, kind) = run_expecting_error(b"1 0 div");

        assert_eq!(kind, "undefinedresult");
    }

    #[test]
    fn atan_range() {
        let mut interpreter = run(b"0 -1 atan");

        let degrees = interpreter.pop().unwrap().into_real().unwrap();
        assert!((degrees - 180.0).abs() < 1e-9);
    }

    #[test]
    fn roll_scenario() {
        let mut interpreter = run(b"(a) (b) (c) 3 -1 roll");

        // top-last order: b, c, a
        assert_string!(interpreter, b"a");
        assert_string!(interpreter, b"c");
        assert_string!(interpreter, b"b");
        assert!(interpreter.pop().is_err());
    }

    #[test]
    fn roll_by_stack_height_is_identity() {
        let mut interpreter = run(b"1 2 3 3 3 roll");

        assert_eq!(interpreter.pop().unwrap(), Object::int(3));
        assert_eq!(interpreter.pop().unwrap(), Object::int(2));
        assert_eq!(interpreter.pop().unwrap(), Object::int(1));
    }

    #[test]
    fn roll_of_one_is_identity() {
        let mut interpreter = run(b"1 2 3 1 7 roll");

        assert_eq!(interpreter.pop().unwrap(), Object::int(3));
        assert_eq!(interpreter.pop().unwrap(), Object::int(2));
        assert_eq!(interpreter.pop().unwrap(), Object::int(1));
    }

    #[test]
    fn index_scenario() {
        let mut interpreter = run(b"1 2 3 4 5 2 index");

        assert_eq!(interpreter.pop().unwrap(), Object::int(3));
        assert_eq!(interpreter.pop().unwrap(), Object::int(5));
    }

    #[test]
    fn copy_n_scenario() {
        let mut interpreter = run(b"(a) (b) (c) 2 copy");

        assert_string!(interpreter, b"c");
        assert_string!(interpreter, b"b");
        assert_string!(interpreter, b"c");
        assert_string!(interpreter, b"b");
        assert_string!(interpreter, b"a");
        assert!(interpreter.pop().is_err());
    }

    #[test]
    fn copy_zero_is_noop() {
        let mut interpreter = run(b"(a) 0 copy");

        assert_string!(interpreter, b"a");
        assert!(interpreter.pop().is_err());
    }

    #[test]
    fn procedure_definition_and_call() {
        let mut interpreter = run(b"/sq { dup mul } def 5 sq");

        assert_eq!(interpreter.pop().unwrap(), Object::int(25));
    }

    #[test]
    fn recursive_procedure() {
        // factorial by recursion through the name
        let mut interpreter = run(
            b"/fact { dup 1 le { pop 1 } { dup 1 sub fact mul } ifelse } def 5 fact",
        );

        assert_eq!(interpreter.pop().unwrap(), Object::int(120));
    }

    #[test]
    fn for_loop_sums() {
        let mut interpreter = run(b"0 1 1 4 { add } for");

        assert_eq!(interpreter.pop().unwrap(), Object::int(10));
        assert!(interpreter.pop().is_err());
    }

    #[test]
    fn for_loop_empty_proc() {
        let mut interpreter = run(b"1 2 6 { } for");

        assert_eq!(interpreter.pop().unwrap(), Object::int(5));
        assert_eq!(interpreter.pop().unwrap(), Object::int(3));
        assert_eq!(interpreter.pop().unwrap(), Object::int(1));
    }

    #[test]
    fn for_loop_negative_fractional_step() {
        let mut interpreter = run(b"3 -.5 1 { } for");

        assert_eq!(interpreter.pop().unwrap(), Object::real(1.0));
        assert_eq!(interpreter.pop().unwrap(), Object::real(1.5));
        assert_eq!(interpreter.pop().unwrap(), Object::real(2.0));
        assert_eq!(interpreter.pop().unwrap(), Object::real(2.5));
        assert_eq!(interpreter.pop().unwrap(), Object::real(3.0));
        assert!(interpreter.pop().is_err());
    }

    #[test]
    fn repeat_loop() {
        let mut interpreter = run(b"0 3 { 1 add } repeat");

        assert_eq!(interpreter.pop().unwrap(), Object::int(3));
    }

    #[test]
    fn loop_with_exit() {
        let mut interpreter = run(b"0 { 1 add dup 5 eq { exit } if } loop");

        assert_eq!(interpreter.pop().unwrap(), Object::int(5));
    }

    #[test]
    fn exit_outside_loop() {
        let (_, kind) = run_expecting_error(b"exit");

        assert_eq!(kind, "invalidexit");
    }

    #[test]
    fn infinite_loop_hits_step_budget() {
        let (_, kind) = run_expecting_error(b"{ } loop");

        assert_eq!(kind, "limitcheck");
    }

    #[test]
    fn counttomark_scenario() {
        let mut interpreter = run(b"mark 3 4 5 counttomark");

        assert_eq!(interpreter.pop().unwrap(), Object::int(3));
        assert_eq!(interpreter.pop().unwrap(), Object::int(5));
        assert_eq!(interpreter.pop().unwrap(), Object::int(4));
        assert_eq!(interpreter.pop().unwrap(), Object::int(3));
        assert!(interpreter.pop().unwrap().is_mark());
    }

    #[test]
    fn cleartomark() {
        let mut interpreter = run(b"1 mark 2 3 cleartomark");

        assert_eq!(interpreter.pop().unwrap(), Object::int(1));
        assert!(interpreter.pop().is_err());
    }

    #[test]
    fn count_scenario() {
        let mut interpreter = run(b"1 1 1 count");

        assert_eq!(interpreter.pop().unwrap(), Object::int(3));
        assert_eq!(interpreter.pop().unwrap(), Object::int(1));
    }

    #[test]
    fn count_on_empty_stack() {
        let mut interpreter = run(b"count");

        assert_eq!(interpreter.pop().unwrap(), Object::int(0));
    }

    #[test]
    fn xor_scenario() {
        let mut interpreter = run(b"true false xor");

        assert_eq!(interpreter.pop().unwrap(), Object::bool(true));
    }

    #[test]
    fn bitwise_on_integers() {
        let mut interpreter = run(b"12 10 and 12 10 or 12 10 xor");

        assert_eq!(interpreter.pop().unwrap(), Object::int(6));
        assert_eq!(interpreter.pop().unwrap(), Object::int(14));
        assert_eq!(interpreter.pop().unwrap(), Object::int(8));
    }

    #[test]
    fn bitshift_both_directions() {
        let mut interpreter = run(b"1 4 bitshift 16 -4 bitshift");

        assert_eq!(interpreter.pop().unwrap(), Object::int(1));
        assert_eq!(interpreter.pop().unwrap(), Object::int(16));
    }

    #[test]
    fn dup_add_equals_two_mul() {
        let mut interpreter = run(b"7 dup add 7 2 mul eq");

        assert_eq!(interpreter.pop().unwrap(), Object::bool(true));
    }

    #[test]
    fn operator_inside_array_is_executed() {
        let mut interpreter = run(b"[1 2 add]");

        let arr = interpreter.pop_array().unwrap();
        let arr = interpreter.vm().get_arr(arr);

        assert_eq!(arr.as_slice(), &[Object::int(3)]);
    }

    #[test]
    fn array_aliasing_through_dup() {
        let mut interpreter = run(b"[1 2 3] dup 1 99 put 1 get");

        assert_eq!(interpreter.pop().unwrap(), Object::int(99));
    }

    #[test]
    fn array_get_put_round_trip() {
        // putting back the value just got leaves the array unchanged
        let mut interpreter = run(b"[5 6 7] dup dup 1 get 1 exch put dup 1 get");

        assert_eq!(interpreter.pop().unwrap(), Object::int(6));
    }

    #[test]
    fn astore_and_aload() {
        let mut interpreter = run(b"10 20 30 3 array astore aload pop");

        assert_eq!(interpreter.pop().unwrap(), Object::int(30));
        assert_eq!(interpreter.pop().unwrap(), Object::int(20));
        assert_eq!(interpreter.pop().unwrap(), Object::int(10));
    }

    #[test]
    fn array_copy_returns_receiving_prefix() {
        let mut interpreter = run(b"/a1 [1 2 3] def a1 dup length array copy length");

        assert_eq!(interpreter.pop().unwrap(), Object::int(3));
    }

    #[test]
    fn forall_over_array() {
        let mut interpreter = run(b"0 [1 2 3] { add } forall");

        assert_eq!(interpreter.pop().unwrap(), Object::int(6));
    }

    #[test]
    fn forall_over_string() {
        let mut interpreter = run(b"0 (abc) { add } forall");

        assert_eq!(interpreter.pop().unwrap(), Object::int(294));
    }

    #[test]
    fn forall_over_dict_in_insertion_order() {
        let mut interpreter = run(
            b"/d 3 dict def d /z 1 put d /a 2 put [ d { pop } forall ]",
        );

        let arr = interpreter.pop_array().unwrap();
        let keys = interpreter.vm().get_arr(arr);

        assert_eq!(keys.len(), 2);

        match &keys.get(0).unwrap().kind {
            ObjectKind::Name(name) => assert_eq!(name.as_bytes(), b"z"),
            other => panic!("expected name, found {:?}", other),
        }
    }

    #[test]
    fn forall_with_exit() {
        let mut interpreter = run(b"[1 2 3 4] { dup 3 eq { exit } if } forall");

        assert_eq!(interpreter.pop().unwrap(), Object::int(3));
        assert_eq!(interpreter.pop().unwrap(), Object::int(2));
        assert_eq!(interpreter.pop().unwrap(), Object::int(1));
    }

    #[test]
    fn string_interval_operators() {
        let mut interpreter = run(b"(abcdef) 1 3 getinterval");

        assert_string!(interpreter, b"bcd");
    }

    #[test]
    fn putinterval_to_exact_end() {
        let mut interpreter = run(b"(abcd) dup 2 (ef) putinterval");

        assert_string!(interpreter, b"abef");
    }

    #[test]
    fn putinterval_past_end_is_rangecheck() {
        let (_, kind) = run_expecting_error(b"(abcd) dup 3 (ef) putinterval");

        assert_eq!(kind, "rangecheck");
    }

    #[test]
    fn search_splits_string() {
        let mut interpreter = run(b"(abcabc) (b) search");

        assert_eq!(interpreter.pop().unwrap(), Object::bool(true));
        assert_string!(interpreter, b"a");
        assert_string!(interpreter, b"b");
        assert_string!(interpreter, b"cabc");
    }

    #[test]
    fn search_miss_leaves_string() {
        let mut interpreter = run(b"(abc) (x) search");

        assert_eq!(interpreter.pop().unwrap(), Object::bool(false));
        assert_string!(interpreter, b"abc");
    }

    #[test]
    fn anchorsearch() {
        let mut interpreter = run(b"(abc) (ab) anchorsearch");

        assert_eq!(interpreter.pop().unwrap(), Object::bool(true));
        assert_string!(interpreter, b"ab");
        assert_string!(interpreter, b"c");
    }

    #[test]
    fn token_reads_first_token() {
        let mut interpreter = run(b"(1 2 add) token");

        assert_eq!(interpreter.pop().unwrap(), Object::bool(true));
        assert_eq!(interpreter.pop().unwrap(), Object::int(1));
        assert_string!(interpreter, b" 2 add");
    }

    #[test]
    fn dict_literal() {
        let mut interpreter = run(b"<< /a 1 /b 2 >> /b get");

        assert_eq!(interpreter.pop().unwrap(), Object::int(2));
    }

    #[test]
    fn dict_begin_def_end() {
        let mut interpreter = run(b"5 dict begin /x 42 def x end");

        assert_eq!(interpreter.pop().unwrap(), Object::int(42));
    }

    #[test]
    fn known_and_where() {
        let mut interpreter = run(
            b"/mydict 5 dict def
              mydict /total 0 put
              mydict /total known
              mydict /missing known",
        );

        assert_eq!(interpreter.pop().unwrap(), Object::bool(false));
        assert_eq!(interpreter.pop().unwrap(), Object::bool(true));
    }

    #[test]
    fn store_replaces_topmost_definition() {
        let mut interpreter = run(b"/x 1 def 10 dict begin /x 2 store x end x");

        assert_eq!(interpreter.pop().unwrap(), Object::int(2));
        assert_eq!(interpreter.pop().unwrap(), Object::int(2));
    }

    #[test]
    fn undef_removes_entry() {
        let mut interpreter = run(b"/d 5 dict def d /k 1 put d /k undef d /k known");

        assert_eq!(interpreter.pop().unwrap(), Object::bool(false));
    }

    #[test]
    fn dict_capacity_overflow() {
        let (_, kind) = run_expecting_error(b"1 dict dup /a 1 put /b 2 put");

        assert_eq!(kind, "dictfull");
    }

    #[test]
    fn maxlength_reports_capacity() {
        let mut interpreter = run(b"7 dict maxlength");

        assert_eq!(interpreter.pop().unwrap(), Object::int(7));
    }

    #[test]
    fn countdictstack_starts_at_two() {
        let mut interpreter = run(b"countdictstack");

        assert_eq!(interpreter.pop().unwrap(), Object::int(2));
    }

    #[test]
    fn undefined_name() {
        let (_, kind) = run_expecting_error(b"no_such_name");

        assert_eq!(kind, "undefined");
    }

    #[test]
    fn stack_underflow_kind() {
        let (_, kind) = run_expecting_error(b"add");

        assert_eq!(kind, "stackunderflow");
    }

    #[test]
    fn typecheck_kind() {
        let (_, kind) = run_expecting_error(b"1 (a) add");

        assert_eq!(kind, "typecheck");
    }

    #[test]
    fn failed_operator_restores_operand_stack() {
        let (interpreter, kind) = run_expecting_error(b"1 2 (a) add");

        assert_eq!(kind, "typecheck");

        // the operands popped by the failing add are back in place
        let stack = interpreter.operand_stack();
        assert_eq!(stack.len(), 3);
        assert_eq!(stack[0], Object::int(1));
        assert_eq!(stack[1], Object::int(2));
    }

    #[test]
    fn stopped_catches_error() {
        let mut interpreter = run(b"{ 1 0 div } stopped");

        assert_eq!(interpreter.pop().unwrap(), Object::bool(true));
    }

    #[test]
    fn stopped_catches_stop() {
        let mut interpreter = run(b"{ 1 stop 2 } stopped");

        assert_eq!(interpreter.pop().unwrap(), Object::bool(true));
        assert_eq!(interpreter.pop().unwrap(), Object::int(1));
    }

    #[test]
    fn stopped_false_on_success() {
        let mut interpreter = run(b"{ 1 } stopped");

        assert_eq!(interpreter.pop().unwrap(), Object::bool(false));
        assert_eq!(interpreter.pop().unwrap(), Object::int(1));
    }

    #[test]
    fn uncaught_stop_terminates_quietly() {
        let mut interpreter = run(b"1 stop 2");

        assert_eq!(interpreter.pop().unwrap(), Object::int(1));
        assert!(interpreter.pop().is_err());
    }

    #[test]
    fn quit_halts_execution() {
        let mut interpreter = run(b"1 quit 2");

        assert_eq!(interpreter.pop().unwrap(), Object::int(1));
        assert!(interpreter.pop().is_err());
    }

    #[test]
    fn exec_runs_procedure() {
        let mut interpreter = run(b"{ 1 2 add } exec");

        assert_eq!(interpreter.pop().unwrap(), Object::int(3));
    }

    #[test]
    fn exec_runs_executable_string() {
        let mut interpreter = run(b"(3 4 mul) cvx exec");

        assert_eq!(interpreter.pop().unwrap(), Object::int(12));
    }

    #[test]
    fn immediate_name_executes() {
        let mut interpreter = run(b"1 2 //add");

        assert_eq!(interpreter.pop().unwrap(), Object::int(3));
    }

    #[test]
    fn type_operator() {
        let mut interpreter = run(b"42 type");

        match interpreter.pop().unwrap() {
            Object {
                kind: ObjectKind::Name(name),
                executable: true,
            } => assert_eq!(name.as_bytes(), b"integertype"),
            other => panic!("expected executable name, found {:?}", other),
        }
    }

    #[test]
    fn cvx_and_xcheck() {
        let mut interpreter = run(b"/foo cvx xcheck /foo xcheck");

        assert_eq!(interpreter.pop().unwrap(), Object::bool(false));
        assert_eq!(interpreter.pop().unwrap(), Object::bool(true));
    }

    #[test]
    fn cvi_truncates_toward_zero() {
        let mut interpreter = run(b"-3.7 cvi 3.7 cvi (42) cvi");

        assert_eq!(interpreter.pop().unwrap(), Object::int(42));
        assert_eq!(interpreter.pop().unwrap(), Object::int(3));
        assert_eq!(interpreter.pop().unwrap(), Object::int(-3));
    }

    #[test]
    fn cvr_parses_strings() {
        let mut interpreter = run(b"(3.14) cvr");

        assert_eq!(interpreter.pop().unwrap(), Object::real(3.14));
    }

    #[test]
    fn cvi_of_garbage_is_typecheck() {
        let (_, kind) = run_expecting_error(b"(hello) cvi");

        assert_eq!(kind, "typecheck");
    }

    #[test]
    fn cvn_preserves_executability() {
        let mut interpreter = run(b"(abc) cvx cvn xcheck");

        assert_eq!(interpreter.pop().unwrap(), Object::bool(true));
    }

    #[test]
    fn cvs_writes_representation() {
        let mut interpreter = run(b"123 8 string cvs");

        assert_string!(interpreter, b"123");
    }

    #[test]
    fn cvrs_hexadecimal() {
        let mut interpreter = run(b"255 16 8 string cvrs");

        assert_string!(interpreter, b"FF");
    }

    #[test]
    fn readonly_array_rejects_put() {
        let (_, kind) = run_expecting_error(b"[1 2 3] readonly dup 0 9 put");

        assert_eq!(kind, "invalidaccess");
    }

    #[test]
    fn access_cannot_be_upgraded() {
        let (_, kind) = run_expecting_error(b"[1] executeonly readonly");

        assert_eq!(kind, "invalidaccess");
    }

    #[test]
    fn rcheck_and_wcheck() {
        let mut interpreter = run(b"[1] readonly dup rcheck exch wcheck");

        assert_eq!(interpreter.pop().unwrap(), Object::bool(false));
        assert_eq!(interpreter.pop().unwrap(), Object::bool(true));
    }

    #[test]
    fn eq_compares_composites_by_identity() {
        let mut interpreter = run(b"[1] dup eq [1] [1] eq");

        assert_eq!(interpreter.pop().unwrap(), Object::bool(false));
        assert_eq!(interpreter.pop().unwrap(), Object::bool(true));
    }

    #[test]
    fn eq_compares_strings_by_value() {
        let mut interpreter = run(b"(abc) (abc) eq (abc) /abc eq");

        assert_eq!(interpreter.pop().unwrap(), Object::bool(true));
        assert_eq!(interpreter.pop().unwrap(), Object::bool(true));
    }

    #[test]
    fn string_ordering_is_lexicographic() {
        let mut interpreter = run(b"(abc) (abd) lt (b) (a) gt");

        assert_eq!(interpreter.pop().unwrap(), Object::bool(true));
        assert_eq!(interpreter.pop().unwrap(), Object::bool(true));
    }

    #[test]
    fn mixed_string_number_comparison_is_typecheck() {
        let (_, kind) = run_expecting_error(b"(a) 1 lt");

        assert_eq!(kind, "typecheck");
    }

    #[test]
    fn bind_resolves_operators_eagerly() {
        let mut interpreter = run(
            b"/p { add } bind def
              /add { pop pop 99 } def
              1 2 p
              3 4 add",
        );

        // the unbound call sees the redefinition, the bound one does not
        assert_eq!(interpreter.pop().unwrap(), Object::int(99));
        assert_eq!(interpreter.pop().unwrap(), Object::int(3));
    }

    #[test]
    fn srand_makes_rand_deterministic() {
        let mut interpreter = run(b"42 srand rand 42 srand rand eq");

        assert_eq!(interpreter.pop().unwrap(), Object::bool(true));
    }

    #[test]
    fn rrand_round_trips_through_srand() {
        // reseeding with the reported state reproduces the next value
        let mut interpreter = run(b"1 srand rrand srand rand 1 srand rand eq");

        assert_eq!(interpreter.pop().unwrap(), Object::bool(true));
    }

    #[test]
    fn save_returns_token_restore_accepts_it() {
        let mut interpreter = run(b"save restore 1");

        assert_eq!(interpreter.pop().unwrap(), Object::int(1));
        assert!(interpreter.pop().is_err());
    }

    #[test]
    fn restore_of_non_save_is_typecheck() {
        let (_, kind) = run_expecting_error(b"1 restore");

        assert_eq!(kind, "typecheck");
    }

    #[test]
    fn readstring_from_currentfile() {
        let mut interpreter = run(b"currentfile 3 string readstring ABC pop");

        assert_string!(interpreter, b"ABC");
    }

    #[test]
    fn filter_decodes_ascii85_from_string() {
        let mut interpreter =
            run(b"(9jqo^F*2M7/c) /ASCII85Decode filter 9 string readstring pop");

        assert_string!(interpreter, b"Man sure.");
    }

    #[test]
    fn filter_decodes_hex_from_currentfile() {
        // the encoded bytes follow the filter call in the source, up to the
        // end-of-data marker; the program resumes after it
        let mut interpreter = run(
            b"currentfile /ASCIIHexDecode filter 48656C6C6F> 5 string readstring pop",
        );

        assert_string!(interpreter, b"Hello");
    }

    #[test]
    fn unknown_filter_name() {
        let (_, kind) = run_expecting_error(b"currentfile /DCTDecode filter");

        assert_eq!(kind, "undefinedfilename");
    }

    #[test]
    fn file_operators_without_provider() {
        let (_, kind) = run_expecting_error(b"(%stdout) (w) file");

        assert_eq!(kind, "undefinedfilename");
    }

    #[test]
    fn step_pump_reaches_finished() {
        let mut interpreter = Interpreter::load(b"1 2 add").unwrap();
        let mut ctx = RecordingContext::new(400.0);

        let mut steps = 0;

        loop {
            match interpreter.step(&mut ctx) {
                Step::Running => steps += 1,
                Step::Finished => break,
                Step::Error { kind, message } => panic!("{}: {}", kind, message),
            }

            assert!(steps < 100, "did not finish");
        }

        assert_eq!(interpreter.pop().unwrap(), Object::int(3));
    }

    #[test]
    fn request_stop_cancels() {
        let mut interpreter = Interpreter::load(b"1 2 add").unwrap();
        let mut ctx = RecordingContext::new(400.0);

        interpreter.request_stop();

        assert_eq!(interpreter.step(&mut ctx), Step::Finished);
        assert!(interpreter.operand_stack().is_empty());
    }

    #[test]
    fn configured_step_budget() {
        let mut interpreter = Interpreter::load(b"1 2 add 3 add")
            .unwrap()
            .with_limits(Limits {
                max_steps: 2,
                ..Limits::default()
            });

        let mut ctx = RecordingContext::new(400.0);

        assert!(interpreter.run(&mut ctx).is_err());
    }

    #[test]
    fn loop_stack_depth_limit() {
        let (_, kind) =
            run_expecting_error(b"/r { 1 1 1 { r } for } def r");

        assert_eq!(kind, "limitcheck");
    }

    #[test]
    fn operand_stack_well_typed_at_end() {
        let interpreter = run(b"1 2.5 (s) /n [1 2] << /a 1 >> true mark");

        for obj in interpreter.operand_stack() {
            // every value carries a valid tag with a nonempty type name
            assert!(!obj.type_name().is_empty());
        }
    }
}
