//! Entry point: logging + CLI flags + lesson dispatch.

use anyhow::{Context, Result, bail};
use asset::ObjLoader;
use platform::WindowConfig;
use renderer::Lesson;

const DEFAULT_MODEL: &str = "assets/cube.obj";

/// Which lesson to run; `Mesh` still needs its model loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LessonKind {
    Clear,
    Triangle,
    TriangleMvp,
    Mesh,
}

fn parse_lesson_arg(args: &[String]) -> LessonKind {
    // Accept: --lesson=clear|triangle|mvp|mesh (also 00..03).
    let mut lesson = LessonKind::Mesh; // default = the full pipeline
    for arg in args {
        if let Some(val) = arg.strip_prefix("--lesson=") {
            lesson = match val.to_ascii_lowercase().as_str() {
                "clear" | "00" | "0" => LessonKind::Clear,
                "triangle" | "tri" | "01" | "1" => LessonKind::Triangle,
                "mvp" | "02" | "2" => LessonKind::TriangleMvp,
                "mesh" | "obj" | "03" | "3" => LessonKind::Mesh,
                other => {
                    eprintln!("[warn] Unknown lesson '{}', falling back to mesh.", other);
                    LessonKind::Mesh
                }
            };
        }
    }
    lesson
}

fn parse_backend_arg(args: &[String]) -> wgpu::Backends {
    // Accept: --gpu-backend=auto|vulkan|dx12|metal|gl
    let mut backends = wgpu::Backends::all(); // default = auto
    for arg in args {
        if let Some(val) = arg.strip_prefix("--gpu-backend=") {
            backends = match val.to_ascii_lowercase().as_str() {
                "auto" => wgpu::Backends::all(),
                "vulkan" | "vk" => wgpu::Backends::VULKAN,
                "dx12" | "d3d12" => wgpu::Backends::DX12,
                "metal" | "mtl" => wgpu::Backends::METAL,
                "gl" | "opengl" | "gles" => wgpu::Backends::GL,
                other => {
                    eprintln!("[warn] Unknown backend '{}', falling back to auto.", other);
                    wgpu::Backends::all()
                }
            };
        }
    }
    backends
}

fn parse_model_arg(args: &[String]) -> String {
    let mut model = DEFAULT_MODEL.to_string();
    for arg in args {
        if let Some(val) = arg.strip_prefix("--model=") {
            model = val.to_string();
        }
    }
    model
}

fn parse_size_args(args: &[String]) -> (u32, u32) {
    let mut w: Option<u32> = None;
    let mut h: Option<u32> = None;

    for arg in args {
        if let Some(v) = arg.strip_prefix("--size=") {
            if let Some((sw, sh)) = v.split_once('x').or_else(|| v.split_once('X')) {
                if let (Ok(pw), Ok(ph)) = (sw.parse::<u32>(), sh.parse::<u32>()) {
                    w = Some(pw);
                    h = Some(ph);
                }
            }
        } else if let Some(v) = arg.strip_prefix("--width=") {
            if let Ok(pw) = v.parse::<u32>() {
                w = Some(pw);
            }
        } else if let Some(v) = arg.strip_prefix("--height=") {
            if let Ok(ph) = v.parse::<u32>() {
                h = Some(ph);
            }
        }
    }

    let ww = w.unwrap_or(1280).max(1);
    let hh = h.unwrap_or(720).max(1);
    (ww, hh)
}

fn build_lesson(kind: LessonKind, model_path: &str) -> Result<Lesson> {
    Ok(match kind {
        LessonKind::Clear => Lesson::Clear,
        LessonKind::Triangle => Lesson::Triangle,
        LessonKind::TriangleMvp => Lesson::TriangleMvp,
        LessonKind::Mesh => {
            let mut loader = ObjLoader::new();
            loader
                .load(model_path)
                .with_context(|| format!("Failed to load model '{model_path}'"))?;
            let mesh = loader
                .mesh()
                .with_context(|| format!("Model '{model_path}' is not renderable"))?;
            if !mesh.is_valid() {
                bail!("Model '{model_path}' contains no triangles");
            }
            log::info!(
                "Loaded '{}': {} triangles",
                model_path,
                loader.triangle_count()
            );
            Lesson::Mesh(mesh)
        }
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let kind = parse_lesson_arg(&args);
    let backends = parse_backend_arg(&args);
    let model_path = parse_model_arg(&args);
    let (width, height) = parse_size_args(&args);

    let lesson = build_lesson(kind, &model_path)?;
    log::info!(
        "Starting lesson '{}'. Backend: {:?}, window_size={}x{}",
        lesson.name(),
        backends,
        width,
        height
    );

    let config = WindowConfig {
        title: format!("GPU Lessons: {}", lesson.name()),
        width,
        height,
        backends,
    };
    platform::run(config, lesson)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}
