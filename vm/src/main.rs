use clap::{Parser as ClapParser, Subcommand};
use std::{fs, process};

use t3_bytecode::{DebugTable, MethodHeader, TableSizes};
use t3_object::Value;
use t3vm::{FuncPtr, FunctionSetCatalog, LinkMode, VM, VMCreateInfo};

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the intrinsic function sets this VM provides
    Sets {
        #[arg(long, help = "Also list every function slot")]
        funcs: bool,
    },

    /// Link function set identifiers the way an image load would
    Link {
        #[arg(required = true, help = "Identifiers in declaration order, e.g. tads-gen/030008")]
        ids: Vec<String>,

        #[arg(long, help = "Fail on sets this VM does not provide")]
        strict: bool,
    },

    /// Decode the method header and tables stored in a code file
    Method {
        #[arg(help = "Raw code pool bytes")]
        file: String,

        #[arg(long, default_value_t = 0, help = "Offset of the method header")]
        offset: u32,

        #[arg(long, help = "Entrypoint record declaring the table sizes")]
        entrypoint: Option<String>,

        #[arg(long, help = "Constant pool bytes, for symbol names stored there")]
        constants: Option<String>,

        #[arg(long, help = "Code page size; by default the file is one page")]
        page_size: Option<u32>,
    },

    /// Call an intrinsic with integer arguments
    Call {
        #[arg(help = "Function set identifier")]
        set: String,

        #[arg(help = "Function index within the set")]
        func: u16,

        #[arg(allow_negative_numbers = true)]
        args: Vec<i32>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Sets { funcs } => list_sets(funcs),
        Command::Link { ids, strict } => link(&ids, strict),
        Command::Method {
            file,
            offset,
            entrypoint,
            constants,
            page_size,
        } => dump_method(&file, offset, entrypoint.as_deref(), constants.as_deref(), page_size),
        Command::Call { set, func, args } => call(&set, func, &args),
    }
}

fn read_file(path: &str) -> Vec<u8> {
    match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("Error reading file '{}': {}", path, err);
            process::exit(1);
        }
    }
}

fn list_sets(funcs: bool) {
    for set in FunctionSetCatalog::with_defaults().sets() {
        let available = set.funcs.iter().filter(|d| d.is_available()).count();
        println!("{}  ({} of {} available)", set.id, available, set.funcs.len());
        if !funcs {
            continue;
        }
        for (idx, desc) in set.funcs.iter().enumerate() {
            println!(
                "  {:3} {:<20} argc {}+{}{}{}",
                idx,
                desc.name,
                desc.min_argc,
                desc.opt_argc,
                if desc.varargs { " ..." } else { "" },
                if desc.is_available() { "" } else { "  [unavailable]" },
            );
        }
    }
}

fn link(ids: &[String], strict: bool) {
    let link_mode = if strict { LinkMode::Strict } else { LinkMode::Late };
    let mut vm = VM::new(VMCreateInfo {
        link_mode,
        ..VMCreateInfo::default()
    });

    for id in ids {
        match vm.bifs.add_entry(id) {
            Ok(idx) if vm.bifs.is_resolved(idx) => {
                let set = vm.bifs.get_entry(idx).map(|s| s.id.as_str()).unwrap_or_default();
                println!("{:3} {} -> {}", idx, id, set);
            }
            Ok(idx) => println!("{:3} {} -> unresolved", idx, id),
            Err(err) => {
                eprintln!("Error linking {}: {} (error {})", id, err, err.code());
                process::exit(1);
            }
        }
    }
}

fn dump_method(
    file: &str,
    offset: u32,
    entrypoint: Option<&str>,
    constants: Option<&str>,
    page_size: Option<u32>,
) {
    let code = read_file(file);
    let code_page_size = page_size.unwrap_or(code.len().clamp(1, u32::MAX as usize) as u32);
    let mut vm = VM::new(VMCreateInfo {
        code_page_size,
        ..VMCreateInfo::default()
    });
    if let Some(path) = entrypoint {
        if let Err(err) = vm.load_entrypoint(&read_file(path)) {
            eprintln!("Error in entrypoint '{}': {}", path, err);
            process::exit(1);
        }
    }
    vm.load_code(&code);
    if let Some(path) = constants {
        vm.load_constants(&read_file(path));
    }

    let hdr = match vm.resolve(Value::CodeOfs(offset)) {
        Ok(hdr) => hdr,
        Err(err) => {
            eprintln!("Error at offset 0x{:x}: {}", offset, err);
            process::exit(1);
        }
    };
    print_header(&hdr);

    let sizes = vm.sizes();
    let ptr = FuncPtr::from_header(hdr);
    if let Some(xt) = ptr.set_exc_ptr(sizes) {
        if let Err(err) = xt.check() {
            eprintln!("Error in exception table at 0x{:x}: {}", hdr.exc_ofs(), err);
            process::exit(1);
        }
        println!("exceptions ({}):", xt.count());
        for e in xt.iter() {
            println!(
                "  [{:04x}, {:04x}] class {:?} -> {:04x}",
                e.start_ofs(),
                e.end_ofs(),
                e.exc_class(),
                e.handler_ofs()
            );
        }
    }
    if let Some(dt) = ptr.set_dbg_ptr(sizes) {
        if let Err(err) = dt.check() {
            eprintln!("Error in debug table at 0x{:x}: {}", hdr.dbg_ofs(), err);
            process::exit(1);
        }
        print_debug(&vm, &dt, sizes);
    }
}

fn print_header(hdr: &MethodHeader<'_>) {
    println!("argc      {}+{}{}", hdr.min_argc(), hdr.opt_argc(), if hdr.is_varargs() { " ..." } else { "" });
    println!("locals    {}", hdr.locals());
    println!("stack     {}", hdr.stack_depth());
    println!("exc_ofs   0x{:04x}", hdr.exc_ofs());
    println!("dbg_ofs   0x{:04x}", hdr.dbg_ofs());
}

fn print_debug(vm: &VM, dt: &DebugTable<'_>, sizes: TableSizes) {
    println!("lines ({}):", dt.line_count());
    for line in dt.lines() {
        println!(
            "  {:04x}  source {} line {} frame {}",
            line.start_ofs(),
            line.source_id(),
            line.source_line(),
            line.frame_id()
        );
    }

    println!("frames ({}):", dt.frame_count());
    for frame in dt.frames() {
        if sizes.frames_have_range() {
            println!(
                "  #{} in #{} [{:04x}, {:04x}]",
                frame.id(),
                frame.enclosing(),
                frame.start_ofs(),
                frame.end_ofs()
            );
        } else {
            println!("  #{} in #{}", frame.id(), frame.enclosing());
        }
        for sym in frame.symbols() {
            let kind = match (sym.is_param(), sym.is_ctx_local()) {
                (true, _) => "param",
                (false, true) => "context",
                (false, false) => "local",
            };
            println!(
                "    {:<8} {:3} {}",
                kind,
                sym.var_num(),
                sym.sym_name(&vm.const_pool).unwrap_or("<?>")
            );
        }
    }
}

fn call(set: &str, func: u16, args: &[i32]) {
    let mut vm = VM::default();
    if let Err(err) = vm.link(&[set]) {
        eprintln!("Error linking {}: {}", set, err);
        process::exit(1);
    }

    let args: Vec<Value> = args.iter().copied().map(Value::Int).collect();
    match vm.call_bif(0, func, &args) {
        Ok(Value::Obj(id)) if vm.objects.string(id).is_some() => {
            println!("{:?}", vm.objects.string(id).unwrap_or_default());
        }
        Ok(val) => println!("{:?}", val),
        Err(err) => {
            eprintln!("Error: {} (error {})", err, err.code());
            process::exit(1);
        }
    }
}
