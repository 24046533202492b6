//! Embedded WGSL sources for the scene's pipelines.
//!
//! The mesh module carries two fragment entry points: `fs_baked` samples the
//! baked-lighting texture, `fs_flat` outputs the node's solid color.  Both
//! materials are unlit; all lighting was pre-computed into the texture.

pub(crate) const MESH_SHADER: &str = r#"
struct GlobalUniform {
    view_proj: mat4x4<f32>,
    camera_position: vec4<f32>,
}

struct MeshConstants {
    model: mat4x4<f32>,
    color: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> globals: GlobalUniform;

@group(1) @binding(0)
var<uniform> mesh: MeshConstants;

@group(2) @binding(0)
var baked_texture: texture_2d<f32>;
@group(2) @binding(1)
var baked_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world = mesh.model * vec4<f32>(input.position, 1.0);
    out.position = globals.view_proj * world;
    out.uv = input.uv;
    return out;
}

@fragment
fn fs_baked(input: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(baked_texture, baked_sampler, input.uv);
}

@fragment
fn fs_flat(input: VertexOutput) -> @location(0) vec4<f32> {
    return mesh.color;
}
"#;

pub(crate) const PORTAL_SHADER: &str = r#"
struct GlobalUniform {
    view_proj: mat4x4<f32>,
    camera_position: vec4<f32>,
}

struct PortalUniform {
    time: f32,
    color_start: vec3<f32>,
    color_end: vec3<f32>,
}

@group(0) @binding(0)
var<uniform> globals: GlobalUniform;

@group(1) @binding(0)
var<uniform> portal: PortalUniform;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.position = globals.view_proj * vec4<f32>(input.position, 1.0);
    out.uv = input.uv;
    return out;
}

fn hash(p: vec2<f32>) -> f32 {
    return fract(sin(dot(p, vec2<f32>(127.1, 311.7))) * 43758.5453123);
}

fn value_noise(p: vec2<f32>) -> f32 {
    let cell = floor(p);
    let frac_part = fract(p);
    let blend = frac_part * frac_part * (3.0 - 2.0 * frac_part);
    let a = hash(cell);
    let b = hash(cell + vec2<f32>(1.0, 0.0));
    let c = hash(cell + vec2<f32>(0.0, 1.0));
    let d = hash(cell + vec2<f32>(1.0, 1.0));
    return mix(mix(a, b, blend.x), mix(c, d, blend.x), blend.y);
}

fn swirl(p: vec2<f32>, time: f32) -> f32 {
    var value = 0.0;
    var amplitude = 0.5;
    var frequency = vec2<f32>(3.0, 3.0);
    for (var octave = 0; octave < 3; octave = octave + 1) {
        value = value + amplitude * value_noise(p * frequency + vec2<f32>(time * 0.15, -time * 0.1));
        amplitude = amplitude * 0.5;
        frequency = frequency * 2.0;
    }
    return value;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let centered = input.uv - vec2<f32>(0.5, 0.5);
    // Displace the lookup so the pattern slowly churns instead of scrolling.
    let displaced = centered + vec2<f32>(
        swirl(centered + vec2<f32>(0.0, 7.0), portal.time) - 0.5,
        swirl(centered + vec2<f32>(5.0, 0.0), portal.time) - 0.5,
    ) * 0.3;

    var strength = swirl(displaced * 2.0, portal.time);
    // Bright rim toward the edge of the portal disc.
    let outer_glow = length(centered) * 1.6 - 0.25;
    strength = clamp(strength + outer_glow, 0.0, 1.0);
    // Sharpen the transition band a little.
    strength = strength + step(0.9, strength) * 0.6;

    let color = mix(portal.color_start, portal.color_end, clamp(strength, 0.0, 1.0));
    return vec4<f32>(color, 1.0);
}
"#;

pub(crate) const FIREFLIES_SHADER: &str = r#"
struct GlobalUniform {
    view_proj: mat4x4<f32>,
    camera_position: vec4<f32>,
}

struct FirefliesUniform {
    pixel_ratio: f32,
    size: f32,
    time: f32,
    _pad: f32,
    resolution: vec2<f32>,
}

struct FireflyInstance {
    position: vec3<f32>,
    scale: f32,
}

@group(0) @binding(0)
var<uniform> globals: GlobalUniform;

@group(1) @binding(0)
var<uniform> fireflies: FirefliesUniform;
@group(1) @binding(1)
var<storage, read> instances: array<FireflyInstance>;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) corner: vec2<f32>,
}

@vertex
fn vs_main(
    @location(0) corner: vec2<f32>,
    @builtin(instance_index) instance_index: u32,
) -> VertexOutput {
    let instance = instances[instance_index];

    // Slow bobbing flight, offset per particle by its x position.
    var world = instance.position;
    world.y = world.y + sin(fireflies.time + instance.position.x * 100.0) * instance.scale * 0.2;

    var clip = globals.view_proj * vec4<f32>(world, 1.0);

    // Billboard sized in pixels with perspective attenuation: the clip-space
    // offset is not scaled by w, so the screen footprint shrinks with depth.
    let size_px = fireflies.size * instance.scale * fireflies.pixel_ratio;
    clip.x = clip.x + corner.x * size_px * 2.0 / fireflies.resolution.x;
    clip.y = clip.y + corner.y * size_px * 2.0 / fireflies.resolution.y;

    var out: VertexOutput;
    out.position = clip;
    out.corner = corner;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let distance_to_center = length(input.corner);
    let strength = clamp(0.05 / distance_to_center - 0.1, 0.0, 1.0);
    return vec4<f32>(vec3<f32>(strength), 1.0);
}
"#;
