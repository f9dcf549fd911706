use std::collections::HashMap;

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    HtmlCanvasElement, WebGl2RenderingContext as GL, WebGlBuffer, WebGlProgram, WebGlShader,
    WebGlUniformLocation, WebGlVertexArrayObject, WebglLoseContext,
};

use crate::backend::{DrawParams, MeshHandle, RenderBackend};
use crate::config::{BlendMode, EffectKind};
use crate::error::EffectError;
use crate::geometry::{MeshData, Primitive, Viewport};
use crate::shader::ShaderProgram;

/// Uniform slots looked up once per program. Missing ones (optimized out
/// or not declared by that effect) are skipped at draw time.
struct Locations {
    time: Option<WebGlUniformLocation>,
    pointer: Option<WebGlUniformLocation>,
    resolution: Option<WebGlUniformLocation>,
    colors: Option<WebGlUniformLocation>,
    model: Option<WebGlUniformLocation>,
    view: Option<WebGlUniformLocation>,
    projection: Option<WebGlUniformLocation>,
}

impl Locations {
    fn lookup(gl: &GL, program: &WebGlProgram) -> Self {
        let at = |name: &str| gl.get_uniform_location(program, name);
        Self {
            time: at("uTime"),
            pointer: at("uPointer"),
            resolution: at("uResolution"),
            colors: at("uColors"),
            model: at("uModel"),
            view: at("uView"),
            projection: at("uProjection"),
        }
    }
}

struct GpuMesh {
    program: WebGlProgram,
    vao: Option<WebGlVertexArrayObject>,
    buffers: Vec<WebGlBuffer>,
    mode: u32,
    count: i32,
    indexed: bool,
    blend: BlendMode,
    depth_write: bool,
    locations: Locations,
}

impl GpuMesh {
    fn delete(&self, gl: &GL) {
        for buffer in &self.buffers {
            gl.delete_buffer(Some(buffer));
        }
        gl.delete_vertex_array(self.vao.as_ref());
        gl.delete_program(Some(&self.program));
    }
}

/// WebGL2 context bound to one canvas.
pub(crate) struct WebGlBackend {
    gl: GL,
    canvas: HtmlCanvasElement,
    meshes: HashMap<u32, GpuMesh>,
    next_id: u32,
    released: bool,
}

impl WebGlBackend {
    pub(crate) fn new(canvas: &HtmlCanvasElement, kind: EffectKind) -> Result<Self, EffectError> {
        let options = js_sys::Object::new();
        js_sys::Reflect::set(&options, &"alpha".into(), &JsValue::TRUE)?;
        js_sys::Reflect::set(&options, &"antialias".into(), &JsValue::TRUE)?;
        if kind == EffectKind::Particles {
            js_sys::Reflect::set(&options, &"powerPreference".into(), &"high-performance".into())?;
        }

        let gl: GL = canvas
            .get_context_with_context_options("webgl2", &options)?
            .ok_or(EffectError::ContextUnavailable)?
            .dyn_into()
            .map_err(|_| EffectError::ContextUnavailable)?;
        gl.clear_color(0.0, 0.0, 0.0, 0.0);

        Ok(Self {
            gl,
            canvas: canvas.clone(),
            meshes: HashMap::new(),
            next_id: 1,
            released: false,
        })
    }

    fn upload(&self, data: &MeshData, source: &ShaderProgram) -> Result<GpuMesh, EffectError> {
        let gl = &self.gl;
        let program = link_program(gl, &source.vertex, &source.fragment)?;
        let mut mesh = GpuMesh {
            locations: Locations::lookup(gl, &program),
            program,
            vao: None,
            buffers: Vec::new(),
            mode: match data.primitive {
                Primitive::Triangles => GL::TRIANGLES,
                Primitive::Points => GL::POINTS,
            },
            count: data.vertex_count as i32,
            indexed: false,
            blend: source.blend,
            depth_write: source.depth_write,
        };

        if let Err(err) = self.fill(&mut mesh, data) {
            gl.bind_vertex_array(None);
            mesh.delete(gl);
            return Err(err);
        }
        Ok(mesh)
    }

    fn fill(&self, mesh: &mut GpuMesh, data: &MeshData) -> Result<(), EffectError> {
        let gl = &self.gl;
        let vao = gl
            .create_vertex_array()
            .ok_or_else(|| EffectError::Resource("vertex array".into()))?;
        gl.bind_vertex_array(Some(&vao));
        mesh.vao = Some(vao);

        for attr in &data.attributes {
            let location = gl.get_attrib_location(&mesh.program, attr.name);
            if location < 0 {
                log::debug!("attribute {} unused by program", attr.name);
                continue;
            }
            let buffer = gl
                .create_buffer()
                .ok_or_else(|| EffectError::Resource(format!("buffer for {}", attr.name)))?;
            gl.bind_buffer(GL::ARRAY_BUFFER, Some(&buffer));
            mesh.buffers.push(buffer);

            let array = js_sys::Float32Array::from(attr.data.as_slice());
            gl.buffer_data_with_array_buffer_view(GL::ARRAY_BUFFER, &array, GL::STATIC_DRAW);
            gl.enable_vertex_attrib_array(location as u32);
            gl.vertex_attrib_pointer_with_i32(location as u32, attr.components, GL::FLOAT, false, 0, 0);
        }

        if let Some(indices) = &data.indices {
            let buffer = gl
                .create_buffer()
                .ok_or_else(|| EffectError::Resource("index buffer".into()))?;
            gl.bind_buffer(GL::ELEMENT_ARRAY_BUFFER, Some(&buffer));
            mesh.buffers.push(buffer);

            let array = js_sys::Uint16Array::from(indices.as_slice());
            gl.buffer_data_with_array_buffer_view(GL::ELEMENT_ARRAY_BUFFER, &array, GL::STATIC_DRAW);
            mesh.count = indices.len() as i32;
            mesh.indexed = true;
        }

        gl.bind_vertex_array(None);
        gl.bind_buffer(GL::ARRAY_BUFFER, None);
        Ok(())
    }
}

impl RenderBackend for WebGlBackend {
    fn resize(&mut self, viewport: &Viewport, max_pixel_ratio: f64) {
        let (width, height) = viewport.buffer_size(max_pixel_ratio);
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        self.gl.viewport(0, 0, width as i32, height as i32);
    }

    fn create_mesh(
        &mut self,
        mesh: &MeshData,
        program: &ShaderProgram,
    ) -> Result<MeshHandle, EffectError> {
        if self.released || self.gl.is_context_lost() {
            return Err(EffectError::ContextUnavailable);
        }
        let gpu = self.upload(mesh, program)?;
        let id = self.next_id;
        self.next_id += 1;
        self.meshes.insert(id, gpu);
        Ok(MeshHandle(id))
    }

    fn draw(&mut self, handle: MeshHandle, params: &DrawParams<'_>) -> Result<(), EffectError> {
        let gl = &self.gl;
        if self.released || gl.is_context_lost() {
            return Err(EffectError::ContextUnavailable);
        }
        let mesh = self
            .meshes
            .get(&handle.0)
            .ok_or_else(|| EffectError::Resource(format!("unknown mesh {}", handle.0)))?;

        gl.clear(GL::COLOR_BUFFER_BIT | GL::DEPTH_BUFFER_BIT);
        gl.use_program(Some(&mesh.program));

        let u = params.uniforms;
        let loc = &mesh.locations;
        gl.uniform1f(loc.time.as_ref(), u.time);
        gl.uniform2f(loc.pointer.as_ref(), u.eased_pointer.x, u.eased_pointer.y);
        gl.uniform2f(loc.resolution.as_ref(), u.resolution.x, u.resolution.y);
        gl.uniform3fv_with_f32_array(loc.colors.as_ref(), &u.colors().to_uniform_array());
        gl.uniform_matrix4fv_with_f32_array(loc.model.as_ref(), false, &params.model.to_cols_array());
        gl.uniform_matrix4fv_with_f32_array(loc.view.as_ref(), false, &params.view.to_cols_array());
        gl.uniform_matrix4fv_with_f32_array(
            loc.projection.as_ref(),
            false,
            &params.projection.to_cols_array(),
        );

        gl.enable(GL::BLEND);
        match mesh.blend {
            BlendMode::Alpha => gl.blend_func_separate(
                GL::SRC_ALPHA,
                GL::ONE_MINUS_SRC_ALPHA,
                GL::ONE,
                GL::ONE_MINUS_SRC_ALPHA,
            ),
            BlendMode::Additive => gl.blend_func(GL::SRC_ALPHA, GL::ONE),
        }
        gl.disable(GL::DEPTH_TEST);
        gl.depth_mask(mesh.depth_write);

        gl.bind_vertex_array(mesh.vao.as_ref());
        if mesh.indexed {
            gl.draw_elements_with_i32(mesh.mode, mesh.count, GL::UNSIGNED_SHORT, 0);
        } else {
            gl.draw_arrays(mesh.mode, 0, mesh.count);
        }
        gl.bind_vertex_array(None);
        Ok(())
    }

    fn release_mesh(&mut self, handle: MeshHandle) {
        if let Some(mesh) = self.meshes.remove(&handle.0) {
            mesh.delete(&self.gl);
        }
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        for (_, mesh) in self.meshes.drain() {
            mesh.delete(&self.gl);
        }
        if let Ok(Some(ext)) = self.gl.get_extension("WEBGL_lose_context") {
            ext.unchecked_into::<WebglLoseContext>().lose_context();
        }
        self.released = true;
    }
}

fn compile_shader(gl: &GL, kind: u32, source: &str) -> Result<WebGlShader, EffectError> {
    let stage = if kind == GL::VERTEX_SHADER { "vertex" } else { "fragment" };
    let shader = gl
        .create_shader(kind)
        .ok_or_else(|| EffectError::Resource(format!("{stage} shader")))?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);

    let ok = gl
        .get_shader_parameter(&shader, GL::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false);
    if ok {
        Ok(shader)
    } else {
        let log = gl.get_shader_info_log(&shader).unwrap_or_default();
        gl.delete_shader(Some(&shader));
        Err(EffectError::ShaderCompile { stage, log })
    }
}

fn link_program(gl: &GL, vertex: &str, fragment: &str) -> Result<WebGlProgram, EffectError> {
    let vs = compile_shader(gl, GL::VERTEX_SHADER, vertex)?;
    let fs = match compile_shader(gl, GL::FRAGMENT_SHADER, fragment) {
        Ok(fs) => fs,
        Err(err) => {
            gl.delete_shader(Some(&vs));
            return Err(err);
        }
    };

    let linked = gl.create_program().map(|program| {
        gl.attach_shader(&program, &vs);
        gl.attach_shader(&program, &fs);
        gl.link_program(&program);
        gl.detach_shader(&program, &vs);
        gl.detach_shader(&program, &fs);
        program
    });
    // the program keeps what it needs after linking
    gl.delete_shader(Some(&vs));
    gl.delete_shader(Some(&fs));

    let program = linked.ok_or_else(|| EffectError::Resource("program".into()))?;
    let ok = gl
        .get_program_parameter(&program, GL::LINK_STATUS)
        .as_bool()
        .unwrap_or(false);
    if ok {
        Ok(program)
    } else {
        let log = gl.get_program_info_log(&program).unwrap_or_default();
        gl.delete_program(Some(&program));
        Err(EffectError::ProgramLink(log))
    }
}
