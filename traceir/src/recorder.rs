//! A trace recording session.
//!
//! A [TraceRecorder] owns the [IRBuffer] and [AbstractStack] for one attempt at recording a
//! trace. The interpreter calls into it once per recorded effect; when recording ends the session
//! is consumed by either [TraceRecorder::finish] or [TraceRecorder::abort].

use crate::{
    abs_stack::AbstractStack,
    config::Config,
    errors::RecordingError,
    ir::{IRBuffer, Node, Opcode, Operand, TRef, Ty},
    log::{IRPhase, Log, Verbosity, log_ir, should_log_ir},
};

pub struct TraceRecorder {
    trace_no: usize,
    buf: IRBuffer,
    stack: AbstractStack,
    config: Config,
    log: Log,
}

impl TraceRecorder {
    /// Start recording trace `trace_no`, whose first instruction executes in the interpreter frame
    /// `[base, top)`. Event logging is configured from `TRACEIR_LOG`.
    pub fn new(
        trace_no: usize,
        base: usize,
        top: usize,
        config: Config,
    ) -> Result<Self, RecordingError> {
        let log = Log::new().map_err(|e| RecordingError::InvalidConfig(e.to_string()))?;
        Self::with_log(trace_no, base, top, config, log)
    }

    /// As [Self::new], but logging events to `log`.
    pub fn with_log(
        trace_no: usize,
        base: usize,
        top: usize,
        config: Config,
        log: Log,
    ) -> Result<Self, RecordingError> {
        let mut buf = IRBuffer::new(config.irbuf_size)?;
        buf.set_cse(config.cse);
        let stack = AbstractStack::with_capacity(config.abs_stack_slots, base, top)?;
        log.log(
            Verbosity::TraceEvent,
            &format!("start recording trace {trace_no}"),
        );
        Ok(Self {
            trace_no,
            buf,
            stack,
            config,
            log,
        })
    }

    pub fn trace_no(&self) -> usize {
        self.trace_no
    }

    pub fn buffer(&self) -> &IRBuffer {
        &self.buf
    }

    pub fn stack(&self) -> &AbstractStack {
        &self.stack
    }

    /// Return the value in slot `n` of the current frame. The first time a slot is read without
    /// having been written, a stack load is emitted and remembered, so later reads reuse it.
    pub fn slot(&mut self, n: i32) -> Result<TRef, RecordingError> {
        if let Some(tref) = self.stack.get(n) {
            return Ok(tref);
        }
        let tref = self.buf.admit(Node::new(
            Opcode::SLoad,
            Ty::Unknown,
            Operand::Lit(self.stack.entry_relative(n)),
            Operand::Lit(0),
        ))?;
        self.stack.set(n, tref);
        Ok(tref)
    }

    /// Record that slot `n` of the current frame now holds `tref`.
    pub fn set_slot(&mut self, n: i32, tref: TRef) {
        self.stack.set(n, tref);
    }

    /// Move to the interpreter frame `[base, top)` after a call or return.
    pub fn frame(&mut self, base: usize, top: usize) -> Result<(), RecordingError> {
        if self.stack.set_frame(base, top) {
            Ok(())
        } else {
            Err(RecordingError::FrameOutOfRange { base, top })
        }
    }

    pub fn kint(&mut self, k: i32) -> Result<TRef, RecordingError> {
        self.buf.kint(k)
    }

    pub fn literal(&mut self, ty: Ty, lit: u64) -> Result<TRef, RecordingError> {
        self.buf.intern(ty, lit)
    }

    /// Add the instruction `node` to the trace. See [IRBuffer::admit].
    pub fn emit(&mut self, node: Node) -> Result<TRef, RecordingError> {
        self.buf.admit(node)
    }

    /// Finish recording successfully, returning the trace's IR.
    pub fn finish(self) -> IRBuffer {
        #[cfg(any(debug_assertions, test))]
        self.buf.assert_well_formed();
        self.log.log(
            Verbosity::TraceEvent,
            &format!("trace {} recorded", self.trace_no),
        );
        self.output(IRPhase::Recorded);
        self.buf
    }

    /// Abandon recording because of `err`, which is returned so that it can be propagated.
    /// Running out of memory is logged as an error; anything else only costs this trace and is a
    /// warning.
    pub fn abort(self, err: RecordingError) -> RecordingError {
        let level = match err {
            RecordingError::ResourceExhausted(_) => Verbosity::Error,
            _ => Verbosity::Warning,
        };
        self.log
            .log(level, &format!("trace {} aborted: {err}", self.trace_no));
        self.output(IRPhase::Aborted);
        err
    }

    fn output(&self, phase: IRPhase) {
        if should_log_ir(phase) {
            log_ir(
                &self
                    .buf
                    .display(self.trace_no)
                    .colour(self.config.colour)
                    .to_string(),
            );
        }
        self.buf.stats().output();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::stats::Stat;
    use fm::FMBuilder;
    use std::{env, fs, process};

    fn recorder(config: Config) -> TraceRecorder {
        TraceRecorder::with_log(
            7,
            1000,
            1004,
            config,
            Log::from_var(Some("0")).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn slot_loads_once() {
        let mut r = recorder(Config::default());
        let a = r.slot(0).unwrap();
        let b = r.slot(0).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.ty(), Ty::Unknown);
        let c = r.slot(1).unwrap();
        assert_ne!(a, c);
        assert_eq!(r.buffer().chain(Opcode::SLoad).len(), 2);
        assert_eq!(r.buffer().node(c.iref()).op1(), Operand::Lit(1));
    }

    #[test]
    fn set_slot() {
        let mut r = recorder(Config::default());
        let x = r.slot(0).unwrap();
        let k = r.kint(1).unwrap();
        let y = r
            .emit(Node::binop(Opcode::Add, Ty::I32, x.iref(), k.iref()))
            .unwrap();
        r.set_slot(0, y);
        assert_eq!(r.slot(0).unwrap(), y);
        assert_eq!(r.buffer().chain(Opcode::SLoad).len(), 1);
        assert_eq!(r.stack().iter_written().collect::<Vec<_>>(), vec![(0, y)]);
    }

    #[test]
    fn frames() {
        let mut r = recorder(Config::default());
        r.slot(3).unwrap();
        // Call into a frame starting at the caller's slot 2.
        r.frame(1002, 1006).unwrap();
        let x = r.slot(1).unwrap();
        // The callee's slot 1 is the caller's slot 3, which has already been loaded.
        assert_eq!(r.buffer().chain(Opcode::SLoad).len(), 1);
        let y = r.slot(2).unwrap();
        assert_ne!(x, y);
        assert_eq!(r.buffer().node(y.iref()).op1(), Operand::Lit(4));
        match r.frame(1, 2) {
            Err(RecordingError::FrameOutOfRange { base: 1, top: 2 }) => (),
            x => panic!("{x:?}"),
        }
        // The failed frame change left the callee's frame in place.
        assert_eq!(r.slot(2).unwrap(), y);
    }

    #[test]
    fn frame_too_big() {
        let config = Config {
            abs_stack_slots: 16,
            ..Config::default()
        };
        assert!(matches!(
            TraceRecorder::with_log(0, 0, 20, config, Log::from_var(Some("0")).unwrap()),
            Err(RecordingError::FrameOutOfRange { base: 0, top: 20 })
        ));
    }

    #[test]
    fn config_cse() {
        let mut r = recorder(Config {
            cse: false,
            ..Config::default()
        });
        let x = r.slot(0).unwrap();
        let a = r
            .emit(Node::binop(Opcode::Mul, Ty::I32, x.iref(), x.iref()))
            .unwrap();
        let b = r
            .emit(Node::binop(Opcode::Mul, Ty::I32, x.iref(), x.iref()))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(r.buffer().stats().get(Stat::CseHit), 0);
    }

    #[test]
    fn finish() {
        let mut r = recorder(Config::default());
        let x = r.slot(0).unwrap();
        let k = r.literal(Ty::I64, 1 << 33).unwrap();
        r.emit(Node::binop(Opcode::Add, Ty::I64, k.iref(), x.iref()))
            .unwrap();
        assert_eq!(r.trace_no(), 7);
        let buf = r.finish();
        let s = buf.display(7).to_string();
        let ptn = "
          ---- TRACE 0007 IR -----------
          K001    i64 KWORD    0x200000000
          0000    ptr BASE     #0   #0
          0001    unk SLOAD    #0   #0
          0002    i64 ADD      0001 K001
        ";
        let fmm = FMBuilder::new(ptn).unwrap().build().unwrap();
        if let Err(e) = fmm.matches(&s) {
            panic!("{e}");
        }
    }

    #[test]
    fn abort() {
        let r = recorder(Config::default());
        let e = r.abort(RecordingError::LimitExceeded("trace too long".to_owned()));
        assert_eq!(e.to_string(), "Limit exceeded: trace too long");
    }

    #[test]
    fn abort_logs() {
        let path = env::temp_dir().join(format!("traceir-abort-{}.log", process::id()));
        let log = Log::from_var(Some(&format!("{}:2", path.display()))).unwrap();
        let r = TraceRecorder::with_log(9, 1000, 1004, Config::default(), log).unwrap();
        r.abort(RecordingError::FrameOutOfRange { base: 1, top: 2 });
        let oom = Vec::<u8>::new().try_reserve(usize::MAX).unwrap_err();
        let log = Log::from_var(Some(&format!("{}:2", path.display()))).unwrap();
        let r = TraceRecorder::with_log(10, 1000, 1004, Config::default(), log).unwrap();
        r.abort(RecordingError::ResourceExhausted(Box::new(oom)));
        let s = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).ok();
        // Creating the second `Log` truncated the file.
        assert!(!s.contains("trace 9"));
        assert!(s.starts_with("traceir-error: trace 10 aborted: Resource exhausted"));
        assert!(!s.contains("trace-event"));

        let path = env::temp_dir().join(format!("traceir-warn-{}.log", process::id()));
        let log = Log::from_var(Some(&format!("{}:2", path.display()))).unwrap();
        let r = TraceRecorder::with_log(11, 1000, 1004, Config::default(), log).unwrap();
        r.abort(RecordingError::FrameOutOfRange { base: 1, top: 2 });
        let s = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(
            s,
            "traceir-warning: trace 11 aborted: Frame [1, 2) does not fit in the abstract stack\n"
        );
    }
}
