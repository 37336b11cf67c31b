//! Executable code buffer and block cache.
//!
//! The code buffer is one fixed-size read-write-execute mapping allocated
//! at startup. The emitter appends bytes at a monotonic write cursor and
//! fails gracefully when the buffer fills or a jump target exceeds rel32
//! range; individual blocks are never freed. A cache flush resets the
//! cursor and invalidates every installed block pointer.
//!
//! The block cache keys installed blocks by the physical address of their
//! first instruction. Abandoned addresses are remembered so the
//! interpreter serves them without recompilation attempts.

use std::collections::HashMap;

use crate::common::EmuError;
use crate::recompiler::ir::{Global, Ty};
use crate::state::Machine;

/// Entry point of one recompiled block.
pub type CodeEntry = unsafe extern "C" fn();

/// The executable code buffer.
pub struct CodeBuffer {
    ptr: *mut u8,
    capacity: usize,
    len: usize,
    failed: bool,
}

// SAFETY: the mapping is uniquely owned; the raw pointer is a storage
// detail.
unsafe impl Send for CodeBuffer {}
unsafe impl Sync for CodeBuffer {}

impl CodeBuffer {
    /// Allocates the read-write-execute mapping.
    ///
    /// # Panics
    ///
    /// Panics if the platform refuses a W+X anonymous mapping; the
    /// recompiler cannot run without one and the caller should disable it
    /// via configuration on such platforms.
    pub fn new(capacity: usize) -> Self {
        // SAFETY: anonymous private mapping, no fixed address.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                capacity,
                libc::PROT_READ | libc::PROT_WRITE | libc::PROT_EXEC,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        assert!(ptr != libc::MAP_FAILED, "code buffer mmap failed");
        Self {
            ptr: ptr.cast::<u8>(),
            capacity,
            len: 0,
            failed: false,
        }
    }

    /// Current write cursor.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether anything has been emitted since the last reset.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Marks the buffer failed; subsequent emits are discarded and the
    /// current block is abandoned by the caller.
    pub fn fail(&mut self) {
        self.failed = true;
    }

    /// Whether a failure occurred since the last `clear_failure`.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Clears the failure flag and rewinds the cursor to `pos` (the start
    /// of the abandoned block).
    pub fn rewind(&mut self, pos: usize) {
        self.failed = false;
        self.len = pos;
    }

    /// Appends one byte.
    #[inline]
    pub fn emit_u8(&mut self, byte: u8) {
        if self.failed {
            return;
        }
        if self.len >= self.capacity {
            self.failed = true;
            return;
        }
        // SAFETY: len < capacity, inside the mapping.
        unsafe { self.ptr.add(self.len).write(byte) };
        self.len += 1;
    }

    /// Appends a little-endian u32.
    #[inline]
    pub fn emit_u32_le(&mut self, val: u32) {
        for b in val.to_le_bytes() {
            self.emit_u8(b);
        }
    }

    /// Appends a little-endian u64.
    #[inline]
    pub fn emit_u64_le(&mut self, val: u64) {
        for b in val.to_le_bytes() {
            self.emit_u8(b);
        }
    }

    /// View of the emitted bytes since the start of the buffer.
    pub fn bytes(&self) -> &[u8] {
        // SAFETY: bytes up to len have been written.
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    /// Host address of the byte at `offset`.
    pub fn ptr_at(&self, offset: usize) -> *mut u8 {
        debug_assert!(offset <= self.capacity);
        // SAFETY: offset within the mapping.
        unsafe { self.ptr.add(offset) }
    }

    /// Patches a previously emitted rel32 at `at` to reach `target`
    /// (both buffer offsets). Fails the buffer if out of rel32 range.
    pub fn patch_rel32(&mut self, at: usize, target: usize) {
        // A failed buffer may not have reserved all four bytes.
        if self.failed || at + 4 > self.capacity {
            self.failed = true;
            return;
        }
        let rel = target as i64 - (at as i64 + 4);
        if rel < i32::MIN as i64 || rel > i32::MAX as i64 {
            self.failed = true;
            return;
        }
        let bytes = (rel as i32).to_le_bytes();
        for (i, b) in bytes.iter().enumerate() {
            // SAFETY: at+4 was emitted before this patch call.
            unsafe { self.ptr.add(at + i).write(*b) };
        }
    }

    /// Function pointer to the code starting at `offset`.
    ///
    /// # Safety
    ///
    /// The bytes at `offset` must be a complete, valid function emitted by
    /// the backend.
    pub unsafe fn entry_at(&self, offset: usize) -> CodeEntry {
        // SAFETY: caller contract.
        unsafe { std::mem::transmute::<*mut u8, CodeEntry>(self.ptr.add(offset)) }
    }

    /// Resets the write cursor; all previously installed code is dead.
    pub fn reset(&mut self) {
        self.len = 0;
        self.failed = false;
    }
}

impl Drop for CodeBuffer {
    fn drop(&mut self) {
        // SAFETY: ptr/capacity describe the mapping created in `new`.
        unsafe {
            libc::munmap(self.ptr.cast::<libc::c_void>(), self.capacity);
        }
    }
}

/// One installed block.
#[derive(Clone, Copy)]
pub struct BlockEntry {
    /// Native entry point.
    pub entry: CodeEntry,
    /// Guest bytes covered, for range invalidation.
    pub guest_len: u64,
}

/// Host binding of one IR global.
#[derive(Clone, Copy)]
pub struct GlobalSlot {
    pub addr: *mut u8,
    pub ty: Ty,
}

/// Recompiler state owned by the machine.
pub struct JitState {
    /// The executable buffer, present when the recompiler is enabled.
    pub buffer: Option<CodeBuffer>,
    /// Installed blocks by physical address; `None` marks an abandoned
    /// address served by the interpreter.
    pub cache: HashMap<u64, Option<BlockEntry>>,
    /// Host addresses of the IR globals, captured at bind time.
    globals: Vec<GlobalSlot>,
    /// The machine this state is bound to.
    machine_ptr: *mut Machine,
}

// SAFETY: the raw pointers target the owning Machine, which also owns this
// state; they never escape the machine's lifetime.
unsafe impl Send for JitState {}
unsafe impl Sync for JitState {}

impl JitState {
    /// Creates an unbound, empty state.
    pub fn new() -> Self {
        Self {
            buffer: None,
            cache: HashMap::new(),
            globals: Vec::new(),
            machine_ptr: std::ptr::null_mut(),
        }
    }

    /// Whether the state has been bound to a machine.
    pub fn is_bound(&self) -> bool {
        !self.machine_ptr.is_null()
    }

    /// The bound machine pointer, passed to native thunks.
    pub fn machine_ptr(&self) -> *mut Machine {
        self.machine_ptr
    }

    /// The host binding of a global.
    pub fn global(&self, g: Global) -> GlobalSlot {
        self.globals[global_index(g)]
    }
}

impl Default for JitState {
    fn default() -> Self {
        Self::new()
    }
}

fn global_index(g: Global) -> usize {
    match g {
        Global::Gpr(i) => i as usize,
        Global::Pc => 32,
        Global::MultHi => 33,
        Global::MultLo => 34,
        Global::Sr => 35,
        Global::Cycles => 36,
        Global::DelaySlot => 37,
    }
}

impl Machine {
    /// Binds the recompiler to this machine: captures the global register
    /// addresses and allocates the code buffer. Must run after the machine
    /// is boxed so the addresses are final.
    pub fn jit_bind(&mut self) {
        if !self.config.recompiler.enabled {
            return;
        }
        let machine_ptr: *mut Machine = self;
        let mut globals = vec![
            GlobalSlot {
                addr: std::ptr::null_mut(),
                ty: Ty::I64,
            };
            38
        ];
        for i in 0..32 {
            globals[i] = GlobalSlot {
                addr: self.cpu.gpr.slot_ptr(i).cast::<u8>(),
                ty: Ty::I64,
            };
        }
        globals[32] = GlobalSlot {
            addr: (&mut self.cpu.pc as *mut u64).cast::<u8>(),
            ty: Ty::I64,
        };
        globals[33] = GlobalSlot {
            addr: (&mut self.cpu.mult_hi as *mut u64).cast::<u8>(),
            ty: Ty::I64,
        };
        globals[34] = GlobalSlot {
            addr: (&mut self.cpu.mult_lo as *mut u64).cast::<u8>(),
            ty: Ty::I64,
        };
        globals[35] = GlobalSlot {
            addr: (&mut self.cpu.cp0.sr as *mut u32).cast::<u8>(),
            ty: Ty::I32,
        };
        globals[36] = GlobalSlot {
            addr: (&mut self.cycles as *mut u64).cast::<u8>(),
            ty: Ty::I64,
        };
        globals[37] = GlobalSlot {
            addr: (&mut self.cpu.in_delay_slot as *mut bool).cast::<u8>(),
            ty: Ty::I8,
        };

        self.jit.globals = globals;
        self.jit.machine_ptr = machine_ptr;
        self.jit.buffer = Some(CodeBuffer::new(self.config.recompiler.code_buffer_size));
    }

    /// Runs recompiled code for the current PC if a block is available,
    /// compiling on first sight.
    ///
    /// # Returns
    ///
    /// `true` when a block executed (the interpreter step is skipped).
    pub fn jit_step(&mut self) -> bool {
        if !self.jit.is_bound() || self.halted {
            return false;
        }
        // Blocks assume a clean sequencer; mid-delay-slot entry belongs to
        // the interpreter.
        if self.cpu.next_action != crate::core::arch::NextAction::Continue {
            return false;
        }
        let Ok(paddr) = self.translate_address(self.cpu.pc, false) else {
            return false;
        };
        // Only DRAM-resident code is recompiled.
        if paddr as usize + 4 > self.dram.len() {
            return false;
        }

        let entry = match self.jit.cache.get(&paddr) {
            Some(None) => return false,
            Some(Some(entry)) => *entry,
            None => match self.compile_block(paddr) {
                Some(entry) => entry,
                None => return false,
            },
        };

        // Interrupts are delivered at block boundaries.
        if self.check_interrupts() {
            // The exception redirected PC through the sequencer; commit it
            // the way the interpreter's step would.
            self.cpu.pc = self.cpu.next_pc;
            self.cpu.next_action = crate::core::arch::NextAction::Continue;
            return true;
        }

        self.stats.block_hits += 1;
        let before = self.cycles;
        // SAFETY: the entry was emitted by the backend for this machine;
        // it reads and writes machine state through the pointers captured
        // at bind time and follows the C ABI.
        unsafe { (entry.entry)() };

        // An exception taken inside the block armed the sequencer with the
        // vector; consume it here the way the interpreter's step would, or
        // the first handler instruction would be re-redirected.
        if self.cpu.next_action == crate::core::arch::NextAction::Jump {
            self.cpu.pc = self.cpu.next_pc;
            self.cpu.next_action = crate::core::arch::NextAction::Continue;
        }

        let delta = self.cycles.wrapping_sub(before);
        self.advance_cp0_timers(delta);
        true
    }

    /// Compiles and installs the block starting at `paddr`; failures mark
    /// the address abandoned so the interpreter serves it from now on.
    fn compile_block(&mut self, paddr: u64) -> Option<BlockEntry> {
        let cfg = self.config.recompiler.clone();
        let max_bytes = cfg.block_instr_max * 4 + 8;
        let end = (paddr as usize + max_bytes).min(self.dram.len());
        let code: Vec<u8> = self.dram[paddr as usize..end].to_vec();
        let vaddr = self.cpu.pc;
        let machine_ptr = self.jit.machine_ptr();

        let compiled = crate::recompiler::builder::build_block(&code, vaddr, machine_ptr, &cfg)
            .and_then(|(graph, guest_len)| {
                let buf = self.jit.buffer.as_mut().ok_or(EmuError::CodeBufferFull)?;
                let offset =
                    crate::recompiler::backend::compile_graph(&graph, &self.jit.globals, buf)?;
                // SAFETY: compile_graph emitted a complete function at
                // `offset`.
                let entry = unsafe { buf.entry_at(offset) };
                Ok(BlockEntry { entry, guest_len })
            });

        match compiled {
            Ok(entry) => {
                self.stats.blocks_compiled += 1;
                self.jit.cache.insert(paddr, Some(entry));
                Some(entry)
            }
            Err(err) => {
                self.stats.blocks_abandoned += 1;
                tracing::debug!(
                    paddr = format_args!("{paddr:#x}"),
                    %err,
                    "block abandoned"
                );
                self.jit.cache.insert(paddr, None);
                None
            }
        }
    }

    /// Invalidates every cached block overlapping the written physical
    /// range. The guest start address of each block is its cache key; the
    /// covered length was recorded at install time.
    pub fn invalidate_blocks(&mut self, paddr: u64, len: u64) {
        if self.jit.cache.is_empty() {
            return;
        }
        let end = paddr + len;
        let before = self.jit.cache.len();
        self.jit.cache.retain(|start, entry| match entry {
            Some(block) => *start >= end || start + block.guest_len <= paddr,
            // Abandoned markers stay: the code at that address did not
            // become translatable by being overwritten.
            None => true,
        });
        if self.jit.cache.len() != before {
            self.stats.cache_invalidations += 1;
        }
    }

    /// Flushes the whole cache after a Status register write: installed
    /// coprocessor guards may assume a stale CU1.
    pub fn invalidate_blocks_on_status_write(&mut self) {
        if self.jit.cache.values().any(Option::is_some) {
            self.stats.cache_invalidations += 1;
        }
        self.jit.cache.clear();
        if let Some(buf) = &mut self.jit.buffer {
            buf.reset();
        }
    }
}
