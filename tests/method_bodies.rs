use classgen::jvm::code::{
    ArithmeticOp, BranchCond, CodeBuilder, CodeBuilderExts, Instruction, MethodHeader, Opcode,
    OrdComparison, Settings, SwitchMode,
};
use classgen::jvm::*;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn static_method(name: &str, descriptor: &str) -> Result<CodeBuilder, Error> {
    init_logging();
    let header = MethodHeader {
        owner: BinaryName::from_string("me/alec/Generated")?,
        name: UnqualifiedName::from_string(name)?,
        descriptor: MethodDescriptor::parse(descriptor)?,
        access_flags: MethodAccessFlags::PUBLIC + MethodAccessFlags::STATIC,
    };
    CodeBuilder::new(header, Settings::default())
}

/// Real instructions emitted by `generate` into a fresh `()V` method
fn opcodes_of(
    generate: impl FnOnce(&mut CodeBuilder) -> Result<(), Error>,
) -> Result<Vec<Instruction>, Error> {
    let mut code = static_method("constant", "()V")?;
    generate(&mut code)?;
    Ok(code
        .current_stream()
        .instructions()
        .iter()
        .filter(|insn| insn.opcode().is_some())
        .cloned()
        .collect())
}

#[test]
fn quick_int_constants() -> Result<(), Error> {
    for value in -1..=5 {
        let insns = opcodes_of(|code| code.const_int(value))?;
        assert!(
            matches!(insns.as_slice(), [Instruction::Plain(_)]),
            "{} gave {:?}",
            value,
            insns
        );
    }
    Ok(())
}

#[test]
fn byte_int_constants() -> Result<(), Error> {
    for value in (-128..=-2).chain(6..=127) {
        let insns = opcodes_of(|code| code.const_int(value))?;
        assert_eq!(insns, vec![Instruction::IntOperand(Opcode::BIPUSH, value)]);
    }
    Ok(())
}

#[test]
fn quick_float_constants() -> Result<(), Error> {
    for value in [0.0f32, 1.0, 2.0] {
        let insns = opcodes_of(|code| code.const_float(value))?;
        assert!(matches!(insns.as_slice(), [Instruction::Plain(_)]));
    }
    for value in [-0.0f32, f32::NAN, 3.0] {
        let insns = opcodes_of(|code| code.const_float(value))?;
        assert!(matches!(insns.as_slice(), [Instruction::Constant(_)]));
        assert_eq!(insns[0].opcode(), Some(Opcode::LDC));
    }
    Ok(())
}

#[test]
fn switch_density() -> Result<(), Error> {
    let generate = |keys: Vec<i32>, mode: SwitchMode| {
        opcodes_of(|code| {
            code.const_int(3)?;
            code.switch(
                keys,
                mode,
                |code, key| {
                    code.const_int(key)?;
                    code.pop(&FieldType::int())
                },
                |_| Ok(()),
            )?;
            code.return_()
        })
    };

    let dense = generate(vec![0, 1, 2, 3, 4], SwitchMode::Auto)?;
    assert!(dense.iter().any(|insn| insn.opcode() == Some(Opcode::TABLESWITCH)));

    let sparse = generate(vec![0, 1000], SwitchMode::Auto)?;
    assert!(sparse.iter().any(|insn| insn.opcode() == Some(Opcode::LOOKUPSWITCH)));

    assert!(matches!(
        generate(vec![5, 1], SwitchMode::Sparse),
        Err(Error::UnsortedSwitchKeys(_))
    ));
    Ok(())
}

#[test]
fn reachability() -> Result<(), Error> {
    let mut code = static_method("loop", "()V")?;
    let label = code.fresh_label();
    assert!(code.is_reachable());
    code.goto_(label)?;
    assert!(!code.is_reachable());
    code.bind_label(label)?;
    assert!(code.is_reachable());

    code.throw()?;
    assert!(!code.is_reachable());
    assert!(code.current_stream().throws());
    assert!(!code.current_stream().returns());

    let after = code.fresh_label();
    code.bind_label(after)?;
    code.return_()?;
    assert!(!code.is_reachable());
    assert!(code.current_stream().returns());
    assert!(code.current_stream().throws());

    assert!(matches!(
        code.bind_label(after),
        Err(Error::DuplicateLabelBinding(l)) if l == after
    ));
    Ok(())
}

#[test]
fn returning_then_branch_skips_exit_jump() -> Result<(), Error> {
    let mut code = static_method("abs", "(I)I")?;
    let x = code.argument(0)?;
    code.get_local(x, &FieldType::int())?;
    code.if_then_else(
        BranchCond::If(OrdComparison::LT),
        |code| {
            code.get_local(x, &FieldType::int())?;
            code.arithmetic(ArithmeticOp::Neg, &FieldType::int())?;
            code.return_value(&FieldType::int())
        },
        |code| {
            code.get_local(x, &FieldType::int())?;
            code.return_value(&FieldType::int())
        },
    )?;
    let code = code.build()?;

    let opcodes: Vec<Opcode> = code.opcodes().collect();
    assert_eq!(
        opcodes,
        vec![
            Opcode::ILOAD,
            Opcode::IFGE,
            Opcode::ILOAD,
            Opcode::INEG,
            Opcode::IRETURN,
            Opcode::ILOAD,
            Opcode::IRETURN,
        ]
    );
    Ok(())
}

#[test]
fn catch_clauses_share_try_range() -> Result<(), Error> {
    let mut code = static_method("safeDivide", "(II)I")?;
    let (x, y) = (code.argument(0)?, code.argument(1)?);
    code.trying(
        |code| {
            code.get_local(x, &FieldType::int())?;
            code.get_local(y, &FieldType::int())?;
            code.arithmetic(ArithmeticOp::Div, &FieldType::int())?;
            code.return_value(&FieldType::int())
        },
        |catches| {
            catches.catching(BinaryName::ARITHMETICEXCEPTION, |code| {
                code.pop(&FieldType::object(BinaryName::ARITHMETICEXCEPTION))?;
                code.const_int(0)?;
                code.return_value(&FieldType::int())
            })?;
            catches.catching(BinaryName::RUNTIMEEXCEPTION, |code| code.throw())?;
            assert!(matches!(
                catches.catching(BinaryName::ARITHMETICEXCEPTION, |code| code.throw()),
                Err(Error::DuplicateCaughtException(Some(_)))
            ));
            Ok(())
        },
    )?;
    code.const_int(-1)?;
    code.return_value(&FieldType::int())?;
    let code = code.build()?;

    let regions = &code.try_catch_regions;
    assert_eq!(regions.len(), 2);
    assert_eq!(
        (regions[0].start, regions[0].end),
        (regions[1].start, regions[1].end)
    );
    assert_ne!(regions[0].handler, regions[1].handler);
    assert_eq!(
        regions[0].exception_type,
        Some(BinaryName::ARITHMETICEXCEPTION)
    );

    // Handlers come after the try range
    let end = code.position(regions[0].end);
    assert!(code.position(regions[0].start) < end);
    assert!(end <= code.position(regions[0].handler));
    assert!(code.position(regions[0].handler) < code.position(regions[1].handler));

    // Nothing falls through into a handler, so there are no jumps
    assert!(code.opcodes().all(|opcode| opcode != Opcode::GOTO));
    Ok(())
}

#[test]
fn access_flags_identity_and_idempotence() {
    let flags = [
        FieldAccessFlags::PUBLIC,
        FieldAccessFlags::PRIVATE,
        FieldAccessFlags::STATIC,
        FieldAccessFlags::VOLATILE,
        FieldAccessFlags::ENUM,
    ];
    for flag in flags {
        assert_eq!(FieldAccessFlags::NONE + flag, flag);
        assert_eq!(flag + flag, flag);
        assert!((flag + FieldAccessFlags::FINAL).contains(flag));
    }
    assert_eq!(
        ClassAccessFlags::PUBLIC + ClassAccessFlags::FINAL,
        ClassAccessFlags::FINAL + ClassAccessFlags::PUBLIC
    );
}

#[test]
fn build_frames_the_instructions() -> Result<(), Error> {
    let mut code = static_method("count", "()J")?;
    code.const_long(7)?;
    code.const_long(1)?;
    code.arithmetic(ArithmeticOp::Add, &FieldType::long())?;
    code.dup(&FieldType::long())?;
    code.pop(&FieldType::long())?;
    code.return_value(&FieldType::long())?;
    let code = code.build()?;

    assert_eq!(code.instructions().len(), 6 + 2);
    assert_eq!(
        code.instructions().first(),
        Some(&Instruction::LabelMark(code.chunk.start))
    );
    assert_eq!(
        code.instructions().last(),
        Some(&Instruction::LabelMark(code.chunk.end))
    );
    assert_eq!(code.max_locals, 0);
    Ok(())
}

/// `static int sum(int n) { int total = 0; for (int i = 0; i < n; i++) total += i; return total; }`
#[test]
fn counting_loop() -> Result<(), Error> {
    let mut code = static_method("sum", "(I)I")?;
    let n = code.argument(0)?;
    let total = code.new_local(UnqualifiedName::from_string("total")?, FieldType::int())?;
    code.zero_local(total, &FieldType::int())?;
    let i = code.new_local(UnqualifiedName::from_string("i")?, FieldType::int())?;
    code.zero_local(i, &FieldType::int())?;

    let condition = code.fresh_label();
    code.block(|code, handle| {
        code.bind_label(condition)?;
        code.get_local(i, &FieldType::int())?;
        code.get_local(n, &FieldType::int())?;
        code.if_cmp(&FieldType::int(), OrdComparison::GE, handle.exit)?;
        code.get_local(total, &FieldType::int())?;
        code.get_local(i, &FieldType::int())?;
        code.arithmetic(ArithmeticOp::Add, &FieldType::int())?;
        code.set_local(total, &FieldType::int())?;
        code.increment(i, 1)?;
        code.goto_(condition)
    })?;
    code.get_local(total, &FieldType::int())?;
    code.return_value(&FieldType::int())?;
    let code = code.build()?;

    assert_eq!((n, total, i), (0, 1, 2));
    assert_eq!(code.max_locals, 3);
    assert_eq!(code.local_variables.len(), 2);

    // The backwards jump targets the loop condition
    let jump_position = code
        .instructions()
        .iter()
        .position(|insn| insn == &Instruction::Jump(Opcode::GOTO, condition))
        .unwrap();
    assert!(code.position(condition).unwrap() < jump_position);

    let opcodes: Vec<Opcode> = code.opcodes().collect();
    assert!(opcodes.contains(&Opcode::IF_ICMPGE));
    assert!(opcodes.contains(&Opcode::IINC));
    Ok(())
}

#[test]
fn unbound_jump_target() -> Result<(), Error> {
    let mut code = static_method("broken", "()V")?;
    let nowhere = code.fresh_label();
    code.goto_(nowhere)?;
    assert!(matches!(
        code.build(),
        Err(Error::UnboundLabels(labels)) if labels == vec![nowhere]
    ));
    Ok(())
}
